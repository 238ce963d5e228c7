//! Data files shipped with stevedore.
//!
//! Every bundled file is compiled into the binary. A copy placed under
//! `Config::data_dir` at the same relative path takes precedence, so a newer
//! `config.guess` can be dropped in without rebuilding.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::util::config::Config;

const EMBEDDED: &[(&str, &[u8])] = &[
    (
        "autotools/config.guess",
        include_bytes!("../../data/autotools/config.guess"),
    ),
    (
        "autotools/config.sub",
        include_bytes!("../../data/autotools/config.sub"),
    ),
];

/// Where a bundled file was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Override found in the configured data directory
    DataDir(PathBuf),
    /// Copy compiled into the binary
    Embedded(&'static str),
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::DataDir(path) => write!(f, "{}", path.display()),
            DataSource::Embedded(relative) => write!(f, "built-in {}", relative),
        }
    }
}

/// Contents of a bundled data file.
#[derive(Debug, Clone)]
pub struct DataFile {
    pub source: DataSource,
    pub contents: Cow<'static, [u8]>,
}

/// Read bundled file `relative`, preferring the data directory copy.
pub fn read(config: &Config, relative: &str) -> io::Result<DataFile> {
    let path = config.data_path(relative);
    if path.is_file() {
        let contents = std::fs::read(&path)?;
        return Ok(DataFile {
            source: DataSource::DataDir(path),
            contents: Cow::Owned(contents),
        });
    }

    EMBEDDED
        .iter()
        .find(|(name, _)| *name == relative)
        .map(|(name, contents)| DataFile {
            source: DataSource::Embedded(*name),
            contents: Cow::Borrowed(*contents),
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no bundled data file `{}`", relative),
            )
        })
}
