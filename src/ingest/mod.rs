/// Conversion between exported sensor tables and the core series types.
///
/// The core never touches the filesystem; binaries read files and hand the
/// text to the parsers here.

pub mod tabular;

#[cfg(test)]
pub(crate) mod fixtures;
