use std::{
    io::{Sink, sink},
    path::PathBuf,
};

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{
        MakeWriter,
        writer::{EitherWriter, MakeWriterExt as _},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initializes `tracing` logging with options from the environment variable
/// given in the `env` parameter.
///
/// We force callers to provide a variable name so it can be different per
/// binary, e.g. `ANCHORAGE_AGENT_LOG`. If the variable is unset, the maximum
/// log level is set to INFO.
///
/// Log output can be copied to a file by setting `{env}_DIRECTORY`
/// (e.g. `ANCHORAGE_AGENT_LOG_DIRECTORY`) to a directory path. This file
/// will be rotated regularly.
pub fn initialize_logging(env: &str, app_name: &str) {
    let filter = match EnvFilter::try_from_env(env) {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::try_new(tracing::Level::INFO.to_string())
            .expect("failed to initialize default tracing level to INFO"),
    };

    let file_appender_directory = std::env::var_os(format!("{env}_DIRECTORY")).map(PathBuf::from);
    let file_appender =
        OptionalMakeWriter::from(file_appender_directory.as_deref().map(|log_dir| {
            RollingFileAppender::builder()
                .filename_suffix(format!("{app_name}.log"))
                .max_log_files(6)
                .build(log_dir)
                .expect("failed to initialize rolling file appender")
        }));

    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stdout.and(file_appender));
    Registry::default().with(filter).with(fmt).init();

    // need to delay logging until after tracing is initialized
    match file_appender_directory {
        Some(dir) => tracing::info!(directory = %dir.display(), "file logging enabled"),
        None => tracing::debug!("file logging disabled, because no log directory set"),
    }
}

/// Like [`EitherWriter`] but implements [`MakeWriter`] instead of
/// [`std::io::Write`]. For selecting writers depending on dynamic
/// configuration.
enum EitherMakeWriter<A, B> {
    A(A),
    B(B),
}

impl<'a, A, B> MakeWriter<'a> for EitherMakeWriter<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = EitherWriter<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        match self {
            Self::A(a) => EitherWriter::A(a.make_writer()),
            Self::B(b) => EitherWriter::B(b.make_writer()),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        match self {
            Self::A(a) => EitherWriter::A(a.make_writer_for(meta)),
            Self::B(b) => EitherWriter::B(b.make_writer_for(meta)),
        }
    }
}

type OptionalMakeWriter<T> = EitherMakeWriter<T, fn() -> Sink>;

impl<T> From<Option<T>> for OptionalMakeWriter<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(t) => Self::A(t),
            None => Self::B(sink),
        }
    }
}
