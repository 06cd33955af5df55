use std::{any::Any, io, panic};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Plain,
    Json,
}

/// Installs the global subscriber on stderr so rendered reports on stdout stay clean.
pub fn setup(format: Format) {
    let builder = tracing_subscriber::fmt().with_writer(io::stderr);
    match format {
        Format::Plain => builder.init(),
        Format::Json => builder.json().init(),
    }
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        tracing::error!(
            target: "panic",
            location = location.as_deref().unwrap_or("unknown"),
            "Panicked: {}",
            panic_message(info.payload())
        );
    }));
}

/// Panic payloads are a `&str` for literal messages and a `String` for formatted ones.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Unknown panic"
    }
}
