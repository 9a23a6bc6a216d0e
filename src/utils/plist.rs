//! Minimal property list access.
//!
//! Values are looked up in the XML form of a plist. Binary plists are first
//! converted with `plutil`, which only exists on macOS; elsewhere only XML
//! plists can be read.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::utils::command::capture_output;

const BINARY_MAGIC: &[u8] = b"bplist";

/// Read a plist file as XML text
pub fn read_plist_xml(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .context(format!("Failed to read plist {}", path.display()))?;

    if bytes.starts_with(BINARY_MAGIC) {
        let path_str = path.to_string_lossy();
        capture_output("plutil", &["-convert", "xml1", "-o", "-", &path_str])
            .context(format!("Failed to convert binary plist {}", path.display()))
    } else {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// First `<string>` value stored under `key`, searching at any depth
pub fn find_string(xml: &str, key: &str) -> Option<String> {
    let pattern = format!(r"<key>{}</key>\s*<string>([^<]*)</string>", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml).map(|caps| unescape(&caps[1]))
}

/// Scalar elements of the first `<array>` stored under `key`
pub fn find_array(xml: &str, key: &str) -> Option<Vec<String>> {
    let pattern = format!(r"(?s)<key>{}</key>\s*<array>(.*?)</array>", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let body = re.captures(xml)?.get(1)?.as_str().to_string();

    let item_re = Regex::new(r"<(string|real|integer)>([^<]*)</(?:string|real|integer)>").ok()?;
    Some(item_re.captures_iter(&body).map(|caps| unescape(&caps[2])).collect())
}

/// Look up a string value directly in a plist file
pub fn read_string(path: &Path, key: &str) -> Option<String> {
    read_plist_xml(path).ok().and_then(|xml| find_string(&xml, key))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
