//! Filesystem side of the pipeline: reading scraped JSON files and moving
//! them into the archive directory once processed.

mod archive;
mod source;

pub use archive::DirectoryArchiver;
pub use source::JsonDirectorySource;
