use sos_derive::sos_error;
use std::borrow::Cow;

#[sos_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Gone{}: {message}", format_context(.context))]
    Gone { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let internal: DemoError = "boom".into();
    assert_eq!(internal.kind(), "Internal");

    let io: DemoError = std::io::Error::other("disk").into();
    assert_eq!(io.kind(), "Io");

    let gone = DemoError::Gone { message: "key".into(), context: None };
    assert_eq!(gone.to_string(), "Gone: key");
}
