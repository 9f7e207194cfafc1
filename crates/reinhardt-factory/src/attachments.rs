//! File and image attachments.
//!
//! [`FileField`] and [`ImageField`] fill file columns with a named
//! [`File`]. Content comes from exactly one source: a path on disk, an
//! already open file, a function producing a file, or generated data
//! (raw bytes for files, a solid-colour picture for images).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{FactoryError, FactoryResult};
use crate::factory::BuildStep;
use crate::orm::File;
use crate::value::{Kwargs, Value};

/// Function producing the attached file.
pub type FileFactoryFn = Arc<dyn Fn() -> io::Result<File> + Send + Sync>;

/// Parameters of an attachment.
///
/// Any parameter left unset falls back to the builder's default.
#[derive(Clone, Default)]
pub struct AttachmentParams {
	/// Raw content for [`FileField`].
	pub data: Option<Vec<u8>>,
	/// File opened read-only from disk.
	pub from_path: Option<PathBuf>,
	/// Already open file.
	pub from_file: Option<File>,
	/// Function called to obtain the file.
	pub from_func: Option<FileFactoryFn>,
	/// Name given to the attached file.
	pub filename: Option<String>,
	pub width: Option<u32>,
	pub height: Option<u32>,
	/// CSS colour name or `#rrggbb`.
	pub color: Option<String>,
	/// Image encoding, e.g. `"JPEG"` or `"PNG"`.
	pub format: Option<String>,
}

impl AttachmentParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
		self.data = Some(data.into());
		self
	}

	pub fn from_path(mut self, path: impl AsRef<Path>) -> Self {
		self.from_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn from_file(mut self, file: File) -> Self {
		self.from_file = Some(file);
		self
	}

	pub fn from_func<F>(mut self, func: F) -> Self
	where
		F: Fn() -> io::Result<File> + Send + Sync + 'static,
	{
		self.from_func = Some(Arc::new(func));
		self
	}

	pub fn filename(mut self, filename: impl Into<String>) -> Self {
		self.filename = Some(filename.into());
		self
	}

	pub fn width(mut self, width: u32) -> Self {
		self.width = Some(width);
		self
	}

	pub fn height(mut self, height: u32) -> Self {
		self.height = Some(height);
		self
	}

	pub fn color(mut self, color: impl Into<String>) -> Self {
		self.color = Some(color.into());
		self
	}

	pub fn format(mut self, format: impl Into<String>) -> Self {
		self.format = Some(format.into());
		self
	}

	/// Reads parameters from `field__param` style overrides.
	///
	/// `from_func` cannot be expressed as a value and is rejected.
	pub fn from_kwargs(kwargs: &Kwargs) -> FactoryResult<Self> {
		let mut params = Self::default();
		for (key, value) in kwargs {
			match (key.as_str(), value) {
				(_, Value::Null) => {}
				("data", Value::Bytes(bytes)) => params.data = Some(bytes.clone()),
				("data", Value::Text(text)) => params.data = Some(text.clone().into_bytes()),
				("from_path", Value::Text(path)) => params.from_path = Some(PathBuf::from(path)),
				("from_file", Value::File(file)) => params.from_file = Some(file.clone()),
				("filename", Value::Text(name)) => params.filename = Some(name.clone()),
				("width", Value::Int(width)) => params.width = Some(dimension(key, *width)?),
				("height", Value::Int(height)) => params.height = Some(dimension(key, *height)?),
				("color", Value::Text(color)) => params.color = Some(color.clone()),
				("format", Value::Text(format)) => params.format = Some(format.clone()),
				_ => {
					return Err(FactoryError::Configuration(format!(
						"Unsupported attachment parameter {}={} ({})",
						key,
						value.type_name(),
						"expected data, from_path, from_file, filename, width, height, color or format"
					)));
				}
			}
		}
		Ok(params)
	}

	/// `self` with every parameter set in `overrides` replaced.
	pub fn merged(&self, overrides: &AttachmentParams) -> AttachmentParams {
		AttachmentParams {
			data: overrides.data.clone().or_else(|| self.data.clone()),
			from_path: overrides.from_path.clone().or_else(|| self.from_path.clone()),
			from_file: overrides.from_file.clone().or_else(|| self.from_file.clone()),
			from_func: overrides.from_func.clone().or_else(|| self.from_func.clone()),
			filename: overrides.filename.clone().or_else(|| self.filename.clone()),
			width: overrides.width.or(self.width),
			height: overrides.height.or(self.height),
			color: overrides.color.clone().or_else(|| self.color.clone()),
			format: overrides.format.clone().or_else(|| self.format.clone()),
		}
	}

	/// Number of content sources set. Empty `data` does not count.
	fn content_sources(&self) -> usize {
		[
			self.data.as_ref().is_some_and(|data| !data.is_empty()),
			self.from_path.is_some(),
			self.from_file.is_some(),
			self.from_func.is_some(),
		]
		.into_iter()
		.filter(|set| *set)
		.count()
	}
}

fn dimension(key: &str, value: i64) -> FactoryResult<u32> {
	u32::try_from(value)
		.ok()
		.filter(|v| *v > 0)
		.ok_or_else(|| FactoryError::Configuration(format!("Invalid image {}: {}", key, value)))
}

impl fmt::Debug for AttachmentParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttachmentParams")
			.field("data", &self.data.as_ref().map(Vec::len))
			.field("from_path", &self.from_path)
			.field("from_file", &self.from_file)
			.field("from_func", &self.from_func.is_some())
			.field("filename", &self.filename)
			.field("width", &self.width)
			.field("height", &self.height)
			.field("color", &self.color)
			.field("format", &self.format)
			.finish()
	}
}

/// Builder of file values.
pub trait AttachmentField: Send + Sync {
	/// Parameters declared on the field.
	fn defaults(&self) -> &AttachmentParams;

	/// Name used when neither `filename` nor a source path is available.
	fn default_filename(&self) -> &'static str;

	/// Content generated when no source is given.
	fn make_data(&self, params: &AttachmentParams) -> FactoryResult<Vec<u8>>;

	/// Resolves the content and the filename.
	fn make_content(&self, params: &AttachmentParams) -> FactoryResult<(String, File)> {
		if params.content_sources() > 1 {
			return Err(FactoryError::Configuration(
				"At most one argument from 'data', 'from_file', 'from_path', and 'from_func' \
				 should be non-empty when calling FileField."
					.to_string(),
			));
		}

		let (path, content) = if let Some(path) = &params.from_path {
			let content = File::open(path)?;
			(Some(path.to_string_lossy().into_owned()), content)
		} else if let Some(file) = &params.from_file {
			(Some(file.name().to_string()), file.clone())
		} else if let Some(func) = &params.from_func {
			let file = func()?;
			(Some(file.name().to_string()), file)
		} else {
			(None, File::from_bytes("", self.make_data(params)?))
		};

		let default_filename = path
			.as_deref()
			.and_then(|path| Path::new(path).file_name())
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| self.default_filename().to_string());
		let filename = params.filename.clone().unwrap_or(default_filename);
		Ok((filename, content))
	}

	/// Produces the file for one generated instance.
	fn generate(&self, step: &BuildStep, overrides: &AttachmentParams) -> FactoryResult<File> {
		let params = self.defaults().merged(overrides);
		let (filename, content) = self.make_content(&params)?;
		tracing::trace!(
			filename = %filename,
			sequence = step.sequence,
			"generated attachment"
		);
		Ok(content.with_name(filename))
	}
}

/// Attachment for file columns. Generated content is `data`, empty by
/// default, named `example.dat`.
///
/// # Examples
///
/// ```
/// use reinhardt_factory::{AttachmentField, AttachmentParams, BuildStep, FileField};
///
/// let field = FileField::with_params(AttachmentParams::new().data(b"hello".to_vec()));
/// let file = field.generate(&BuildStep::default(), &AttachmentParams::new()).unwrap();
/// assert_eq!(file.name(), "example.dat");
/// assert_eq!(file.read_all().unwrap(), b"hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileField {
	defaults: AttachmentParams,
}

impl FileField {
	pub const DEFAULT_FILENAME: &'static str = "example.dat";

	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_params(defaults: AttachmentParams) -> Self {
		Self { defaults }
	}
}

impl AttachmentField for FileField {
	fn defaults(&self) -> &AttachmentParams {
		&self.defaults
	}

	fn default_filename(&self) -> &'static str {
		Self::DEFAULT_FILENAME
	}

	fn make_data(&self, params: &AttachmentParams) -> FactoryResult<Vec<u8>> {
		Ok(params.data.clone().unwrap_or_default())
	}
}

/// Attachment for image columns. Generated content is a `width`×`height`
/// rectangle of `color` encoded as `format`, by default a 100×100 blue
/// JPEG named `example.jpg`. `height` defaults to `width`.
#[derive(Debug, Clone, Default)]
pub struct ImageField {
	defaults: AttachmentParams,
}

impl ImageField {
	pub const DEFAULT_FILENAME: &'static str = "example.jpg";
	pub const DEFAULT_WIDTH: u32 = 100;
	pub const DEFAULT_COLOR: &'static str = "blue";
	pub const DEFAULT_FORMAT: &'static str = "JPEG";

	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_params(defaults: AttachmentParams) -> Self {
		Self { defaults }
	}
}

impl AttachmentField for ImageField {
	fn defaults(&self) -> &AttachmentParams {
		&self.defaults
	}

	fn default_filename(&self) -> &'static str {
		Self::DEFAULT_FILENAME
	}

	fn make_data(&self, params: &AttachmentParams) -> FactoryResult<Vec<u8>> {
		let width = params.width.unwrap_or(Self::DEFAULT_WIDTH);
		let height = params.height.unwrap_or(width);
		let color = parse_color(params.color.as_deref().unwrap_or(Self::DEFAULT_COLOR))?;
		let format = params.format.as_deref().unwrap_or(Self::DEFAULT_FORMAT);
		render_image(width, height, color, format)
	}
}

#[cfg(feature = "images")]
fn render_image(width: u32, height: u32, color: [u8; 3], format: &str) -> FactoryResult<Vec<u8>> {
	use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

	let image_format = ImageFormat::from_extension(format.to_lowercase())
		.ok_or_else(|| FactoryError::Configuration(format!("Unknown image format: {}", format)))?;
	let picture = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
	let mut buffer = Vec::new();
	picture
		.write_to(&mut io::Cursor::new(&mut buffer), image_format)
		.map_err(|e| FactoryError::Image(format!("Failed to encode image: {}", e)))?;
	Ok(buffer)
}

#[cfg(not(feature = "images"))]
fn render_image(_width: u32, _height: u32, _color: [u8; 3], _format: &str) -> FactoryResult<Vec<u8>> {
	Err(FactoryError::Configuration(
		"ImageField requires the `images` feature".to_string(),
	))
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
	("black", [0, 0, 0]),
	("white", [255, 255, 255]),
	("red", [255, 0, 0]),
	("green", [0, 128, 0]),
	("lime", [0, 255, 0]),
	("blue", [0, 0, 255]),
	("navy", [0, 0, 128]),
	("yellow", [255, 255, 0]),
	("cyan", [0, 255, 255]),
	("magenta", [255, 0, 255]),
	("gray", [128, 128, 128]),
	("grey", [128, 128, 128]),
	("orange", [255, 165, 0]),
	("purple", [128, 0, 128]),
	("pink", [255, 192, 203]),
	("brown", [165, 42, 42]),
];

/// Parses a colour name or a `#rgb` / `#rrggbb` hex code.
fn parse_color(color: &str) -> FactoryResult<[u8; 3]> {
	let unknown = || FactoryError::Configuration(format!("Unknown color: {}", color));
	if let Some(hex) = color.strip_prefix('#') {
		if !hex.is_ascii() {
			return Err(unknown());
		}
		let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| unknown());
		return match hex.len() {
			3 => {
				let mut rgb = [0u8; 3];
				for (i, slot) in rgb.iter_mut().enumerate() {
					*slot = channel(&hex[i..i + 1])? * 17;
				}
				Ok(rgb)
			}
			6 => Ok([
				channel(&hex[0..2])?,
				channel(&hex[2..4])?,
				channel(&hex[4..6])?,
			]),
			_ => Err(unknown()),
		};
	}
	let lowered = color.to_lowercase();
	NAMED_COLORS
		.iter()
		.find(|(name, _)| *name == lowered)
		.map(|(_, rgb)| *rgb)
		.ok_or_else(unknown)
}
