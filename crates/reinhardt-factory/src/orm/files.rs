//! File values stored in file and image fields.

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Readable, seekable content source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A named file.
///
/// The name is what gets stored in the column; the content is shared
/// between clones, the way several field values may wrap one open file.
///
/// # Examples
///
/// ```
/// use reinhardt_factory::orm::File;
///
/// let file = File::from_bytes("notes.txt", b"hello".to_vec());
/// assert_eq!(file.name(), "notes.txt");
/// assert_eq!(file.read_all().unwrap(), b"hello");
/// ```
#[derive(Clone)]
pub struct File {
	name: String,
	path: Option<PathBuf>,
	content: Arc<Mutex<Box<dyn ReadSeek>>>,
}

impl File {
	/// In-memory content.
	pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
		Self::from_reader(name, Cursor::new(data))
	}

	/// Wraps an already open reader.
	pub fn from_reader(name: impl Into<String>, reader: impl ReadSeek + 'static) -> Self {
		Self {
			name: name.into(),
			path: None,
			content: Arc::new(Mutex::new(Box::new(reader))),
		}
	}

	/// Opens `path` read-only. The file is named after the full path.
	pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
		let path = path.as_ref();
		let handle = fs::File::open(path)?;
		Ok(Self {
			name: path.to_string_lossy().into_owned(),
			path: Some(path.to_path_buf()),
			content: Arc::new(Mutex::new(Box::new(handle))),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Filesystem path, for files opened from disk.
	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Same content under another name.
	pub fn with_name(&self, name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			path: self.path.clone(),
			content: Arc::clone(&self.content),
		}
	}

	/// Reads the whole content from the start.
	pub fn read_all(&self) -> io::Result<Vec<u8>> {
		let mut content = self.content.lock();
		content.seek(SeekFrom::Start(0))?;
		let mut buffer = Vec::new();
		content.read_to_end(&mut buffer)?;
		Ok(buffer)
	}

	/// Content length in bytes.
	pub fn size(&self) -> io::Result<u64> {
		let mut content = self.content.lock();
		let size = content.seek(SeekFrom::End(0))?;
		content.seek(SeekFrom::Start(0))?;
		Ok(size)
	}

	/// Whether both values share the same content.
	pub fn same_content(&self, other: &File) -> bool {
		Arc::ptr_eq(&self.content, &other.content)
	}
}

impl PartialEq for File {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.same_content(other)
	}
}

impl fmt::Debug for File {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("File")
			.field("name", &self.name)
			.field("path", &self.path)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_open_names_file_after_path() {
		let mut tmp = tempfile::NamedTempFile::new().unwrap();
		tmp.write_all(b"on disk").unwrap();

		let file = File::open(tmp.path()).unwrap();
		assert_eq!(file.name(), tmp.path().to_string_lossy());
		assert_eq!(file.path(), Some(tmp.path()));
		assert_eq!(file.read_all().unwrap(), b"on disk");
		assert_eq!(file.size().unwrap(), 7);
	}

	#[rstest]
	fn test_open_missing_file() {
		let error = File::open("/nonexistent/reinhardt/file.dat").unwrap_err();
		assert_eq!(error.kind(), io::ErrorKind::NotFound);
	}

	#[rstest]
	fn test_with_name_shares_content() {
		let file = File::from_bytes("a.txt", b"abc".to_vec());
		let renamed = file.with_name("b.txt");
		assert_eq!(renamed.name(), "b.txt");
		assert!(renamed.same_content(&file));
		assert_ne!(renamed, file);
		assert_eq!(renamed.read_all().unwrap(), b"abc");
		// Reading twice starts from the beginning each time.
		assert_eq!(file.read_all().unwrap(), b"abc");
	}
}
