// Test module - relaxed lint rules
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::uninlined_format_args)]
#![allow(missing_docs)]

use aiclip::intent::Intent;
use aiclip::resolve::PathResolver;
use aiclip::security::Validator;
use aiclip::{
    ActionKind, Defaults, ErrorCode, Operation, Output, ParamKey, ParamValue, Position,
};
use std::path::PathBuf;

struct Fixture {
    _dir: tempfile::TempDir,
    media: PathBuf,
}

impl Fixture {
    fn new(files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let media = std::fs::canonicalize(dir.path()).unwrap();
        for file in files {
            std::fs::write(media.join(file), b"data").unwrap();
        }
        Self { _dir: dir, media }
    }

    fn compile(&self, json: &str) -> aiclip::AiclipResult<aiclip::ActionDescriptor> {
        let resolver = PathResolver::new(Validator::new(vec![self.media.clone()]), &self.media);
        Intent::from_json(json)?.compile(&resolver, &Defaults::default())
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Intent::from_json(r#"{"action":"convert","inputs":[],"shell":"rm -rf /"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
    assert!(err.message.contains("shell"));
}

#[test]
fn interpreter_error_reply_is_surfaced_sanitized() {
    let err = Intent::from_json(
        r#"{"error":"unsupported_action","message":"cannot do that with key sk-abcdefghijklmnopqr"}"#,
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
    assert!(err.message.contains("unsupported_action"));
    assert!(!err.message.contains("sk-abcdefghijklmnopqr"));
}

#[test]
fn malformed_json_is_invalid_parameter() {
    let err = Intent::from_json("convert everything please").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
}

#[test]
fn raw_filters_and_flags_are_never_forwarded() {
    let fx = Fixture::new(&["a.mp4"]);
    let err = fx
        .compile(r#"{"action":"convert","inputs":["a.mp4"],"filters":"scale=1:1,drawtext=x"}"#)
        .unwrap_err();
    assert!(err.message.contains("filters"));
    let err = fx
        .compile(r#"{"action":"convert","inputs":["a.mp4"],"extra_flags":["-f","null"]}"#)
        .unwrap_err();
    assert!(err.message.contains("extra_flags"));

    fx.compile(r#"{"action":"convert","inputs":["a.mp4"],"filters":[],"extra_flags":""}"#)
        .unwrap();
}

#[test]
fn action_aliases_map_to_operations() {
    let fx = Fixture::new(&["a.mp4"]);
    let cases = [
        ("format_convert", Operation::Convert),
        ("resize", Operation::Scale),
        ("segment", Operation::Trim),
        ("Extract_Audio", Operation::ExtractAudio),
    ];
    for (action, op) in cases {
        let intent = Intent {
            action: action.to_string(),
            ..Intent::default()
        };
        assert_eq!(intent.kind().unwrap(), ActionKind::Single(op), "{action}");
    }
    let err = fx
        .compile(r#"{"action":"transmogrify","inputs":["a.mp4"]}"#)
        .unwrap_err();
    assert!(err.message.contains("action"));
}

#[test]
fn glob_or_batch_prefix_selects_batch_mode() {
    let fx = Fixture::new(&["a.mp4", "b.mp4", "c.mov"]);
    let descriptor = fx
        .compile(r#"{"action":"convert","glob":"*.mp4"}"#)
        .unwrap();
    assert_eq!(descriptor.kind(), ActionKind::Batch(Operation::Convert));
    assert_eq!(descriptor.inputs().len(), 2);
    let Output::PerInput(outputs) = descriptor.output() else {
        panic!("expected per-input outputs");
    };
    assert_eq!(outputs[0].path(), fx.media.join("a_converted.mp4"));

    let descriptor = fx
        .compile(r#"{"action":"batch_remove_audio","inputs":["a.mp4","c.mov"]}"#)
        .unwrap();
    assert_eq!(descriptor.kind(), ActionKind::Batch(Operation::RemoveAudio));
}

#[test]
fn batch_rejects_a_single_explicit_output() {
    let fx = Fixture::new(&["a.mp4", "b.mp4"]);
    let err = fx
        .compile(r#"{"action":"convert","glob":"*.mp4","output":"all.mp4"}"#)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
    assert!(err.message.contains("output_dir"));
}

#[test]
fn single_action_with_several_inputs_is_unbuildable() {
    let fx = Fixture::new(&["a.mp4", "b.mp4"]);
    let err = fx
        .compile(r#"{"action":"convert","inputs":["a.mp4","b.mp4"]}"#)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnbuildableAction);
}

#[test]
fn typed_parameters_are_parsed() {
    let fx = Fixture::new(&["a.mp4", "logo.png"]);
    let descriptor = fx
        .compile(
            r#"{"action":"overlay","inputs":["a.mp4"],"overlay_path":"logo.png","overlay_xy":"5,7"}"#,
        )
        .unwrap();
    assert_eq!(
        descriptor.param(ParamKey::Position),
        Some(&ParamValue::Position(Position { x: 5, y: 7 }))
    );
    let Some(ParamValue::Source(source)) = descriptor.param(ParamKey::Overlay) else {
        panic!("overlay source missing");
    };
    assert_eq!(source.path(), fx.media.join("logo.png"));

    let descriptor = fx
        .compile(r#"{"action":"trim","inputs":["a.mp4"],"start":1.25,"duration":"10s"}"#)
        .unwrap();
    assert_eq!(descriptor.param(ParamKey::Start), Some(&ParamValue::Time(1_250)));
    assert_eq!(descriptor.param(ParamKey::Duration), Some(&ParamValue::Time(10_000)));
}

#[test]
fn parameters_foreign_to_the_operation_are_rejected() {
    let fx = Fixture::new(&["a.mp4"]);
    let err = fx
        .compile(r#"{"action":"trim","inputs":["a.mp4"],"duration":5,"crf":20}"#)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
    assert!(err.message.contains("crf"));
}

#[test]
fn negative_numbers_are_rejected() {
    let fx = Fixture::new(&["a.mp4"]);
    let err = fx
        .compile(r#"{"action":"compress","inputs":["a.mp4"],"crf":-3}"#)
        .unwrap_err();
    assert!(err.message.contains("[0,51]"));
    let err = fx
        .compile(r#"{"action":"trim","inputs":["a.mp4"],"start":-1,"duration":5}"#)
        .unwrap_err();
    assert!(err.message.contains("start"));
}

#[test]
fn output_dir_places_default_output() {
    let fx = Fixture::new(&["a.mp4"]);
    std::fs::create_dir(fx.media.join("out")).unwrap();
    let descriptor = fx
        .compile(r#"{"action":"thumbnail","inputs":["a.mp4"],"output_dir":"out"}"#)
        .unwrap();
    let Output::File(output) = descriptor.output() else {
        panic!("expected a single output");
    };
    assert_eq!(output.path(), fx.media.join("out/a_thumb.png"));
}
