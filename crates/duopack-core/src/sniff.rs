use std::fs::File;
use std::io::Read;
use std::path::Path;

const NOT_FOUND_MARKER: &[u8] = b"<head><title>404 Not Found</title></head>";
const DOCTYPE_MARKER: &[u8] = b"<!DOCTYPE HTML>";

// Error pages are small; sniffing a bounded prefix avoids pulling a whole
// archive into memory.
const SNIFF_LIMIT: usize = 64 * 1024;

/// Some hosts answer missing paths with a 200 and an HTML error body. Treat
/// such a body as a failed fetch regardless of what the transport reported.
pub fn looks_like_error_page(path: &Path) -> bool {
    let Some(head) = read_prefix(path, SNIFF_LIMIT) else {
        return false;
    };
    contains(&head, NOT_FOUND_MARKER) || contains(&head, DOCTYPE_MARKER)
}

/// A file is text when its first 512 bytes contain no NUL byte.
pub fn is_text_file(path: &Path) -> bool {
    let Some(head) = read_prefix(path, 512) else {
        return false;
    };
    !head.contains(&0)
}

fn read_prefix(path: &Path, limit: usize) -> Option<Vec<u8>> {
    let mut file = File::open(path).ok()?;
    let mut buf = vec![0u8; limit];
    let mut read = 0;
    while read < buf.len() {
        match file.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(_) => return None,
        }
    }
    buf.truncate(read);
    Some(buf)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}
