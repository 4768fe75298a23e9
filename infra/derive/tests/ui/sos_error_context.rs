use sos_derive::sos_error;
use std::borrow::Cow;

#[sos_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

fn open_missing() -> Result<std::fs::File, DemoError> {
    std::fs::File::open("/definitely/not/here").context("Opening fixture")
}

fn main() {
    let err = open_missing().expect_err("file must not exist");
    assert!(err.to_string().starts_with("IO error (Opening fixture): "));

    let relabelled: Result<(), DemoError> = Err(err);
    let err = relabelled.context("Second label").expect_err("still an error");
    assert!(err.to_string().starts_with("IO error (Second label): "));
}
