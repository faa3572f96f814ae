use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reads a corpus file and returns its lines, one sentence per line.
///
/// - Splits on `\n` / `\r\n`
/// - Invalid UTF-8 is replaced rather than rejected
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut reader = BufReader::new(File::open(filename)?);
	let mut lines = Vec::new();
	let mut buf = Vec::new();
	while reader.read_until(b'\n', &mut buf)? > 0 {
		let line = String::from_utf8_lossy(&buf);
		lines.push(line.trim_end_matches(['\n', '\r']).to_owned());
		buf.clear();
	}
	Ok(lines)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/corpus.txt` + `"bin"` → `data/corpus.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// `"./data/corpus.txt"` → `"corpus"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("data/corpus.txt", "bin").unwrap();
		assert_eq!(path, PathBuf::from("data/corpus.bin"));
	}

	#[test]
	fn filename_is_stem() {
		assert_eq!(get_filename("./data/corpus.txt").unwrap(), "corpus");
		assert!(get_filename("").is_err());
	}

	#[test]
	fn read_file_strips_terminators() {
		let path = std::env::temp_dir().join(format!("rs-markov-io-{}.txt", std::process::id()));
		std::fs::write(&path, "a b\r\n\nc").unwrap();
		let lines = read_file(&path).unwrap();
		std::fs::remove_file(&path).unwrap();
		assert_eq!(lines, vec!["a b", "", "c"]);
	}
}
