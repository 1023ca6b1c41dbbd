use anyhow::Result;

/// A trait for things that can be output as a document.
///
/// This trait is used to factor output-related code, such as friendly handling of buffering, into
/// one place.
pub trait Reportable {
    type Format;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()>;
}

/// Report `reportable` to `writer`, ignoring a closed pipe, like those that can come from piping
/// to `head`.
pub fn report_to<R: Reportable, W: std::io::Write>(
    reportable: &R,
    format: R::Format,
    writer: W,
) -> Result<()> {
    match reportable.report(format, writer) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            _ => Err(e),
        },
    }
}
