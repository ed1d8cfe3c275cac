use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Files under `root` whose extension is `ext`, sorted by their path relative
/// to `root` so discovery order does not depend on the file system.
pub fn files_with_extension(root: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    scan_into(root, ext, &mut found)?;
    found.sort_by(|a, b| a.strip_prefix(root).ok().cmp(&b.strip_prefix(root).ok()));
    Ok(found)
}

fn scan_into(dir: &Path, ext: &str, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_into(&path, ext, found)?;
        } else if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ext) {
            found.push(path);
        }
    }
    Ok(())
}
