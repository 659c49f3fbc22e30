//! File helpers shared by the commands

use std::path::Path;

use eyre::WrapErr;

/// Read a DER file, also accepting hex text
pub fn read_der(path: &Path) -> eyre::Result<Vec<u8>> {
    let bytes = std::fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    decode_input(&bytes).wrap_err_with(|| format!("decoding {}", path.display()))
}

/// Raw bytes, or the decoded value if the input is hex text
pub fn decode_input(bytes: &[u8]) -> eyre::Result<Vec<u8>> {
    let is_text = !bytes.is_empty()
        && bytes
            .iter()
            .all(|b| b.is_ascii_hexdigit() || b.is_ascii_whitespace());
    if !is_text {
        return Ok(bytes.to_vec());
    }
    let digits: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(hex::decode(digits)?)
}

/// Write `contents` to `dir/name`, creating `dir` if needed
pub fn write_output(dir: &Path, name: &str, contents: &[u8]) -> eyre::Result<std::path::PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents).wrap_err_with(|| format!("writing {}", path.display()))?;
    Ok(path)
}
