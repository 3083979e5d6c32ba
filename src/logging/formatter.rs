use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Run-log line layout:
/// `[TIMESTAMP] [LEVEL] [STAGE] [TARGET: FILE:LINE]: MESSAGE`
///
/// STAGE is the chain of open spans, outermost first (`pipeline/fetch`).
/// Events outside any span show the last segment of their module path.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedFormatter {
    utc: bool,
}

impl BracketedFormatter {
    /// Local wall-clock timestamps
    pub fn local() -> Self {
        Self { utc: false }
    }

    /// UTC timestamps with a `Z` suffix
    pub fn utc() -> Self {
        Self { utc: true }
    }

    fn write_timestamp(&self, writer: &mut Writer<'_>) -> fmt::Result {
        const LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
        if self.utc {
            write!(writer, "[{}Z] ", chrono::Utc::now().format(LAYOUT))
        } else {
            write!(writer, "[{}] ", chrono::Local::now().format(LAYOUT))
        }
    }
}

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        self.write_timestamp(&mut writer)?;
        write!(writer, "[{:5}] ", metadata.level())?;

        let stage = match ctx.event_scope() {
            Some(scope) => scope
                .from_root()
                .map(|span| span.name())
                .collect::<Vec<_>>()
                .join("/"),
            None => metadata
                .target()
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        write!(writer, "[{}] ", stage)?;

        match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => write!(writer, "[{}: {}:{}]: ", metadata.target(), file, line)?,
            _ => write!(writer, "[{}]: ", metadata.target())?,
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
