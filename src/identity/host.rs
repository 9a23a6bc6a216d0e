use std::fs;
use std::path::Path;

use log::{debug, warn};
use regex::Regex;

use crate::constants::{ADDRESS_UNKNOWN, HOSTNAME_ERROR, PREFERENCES_PLIST, WIFI_LOG};
use crate::utils::command::capture_output;
use crate::utils::plist::{find_string, read_plist_xml};

/// Resolve the host name of the system being collected.
///
/// A live system asks the kernel; an image is read from the system
/// configuration preferences, preferring `HostName` over `LocalHostName`.
pub fn resolve_hostname(input_root: &Path, live: bool) -> String {
    let resolved = if live {
        hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned())
            .filter(|h| !h.is_empty())
    } else {
        let plist = input_root.join(PREFERENCES_PLIST);
        match read_plist_xml(&plist) {
            Ok(xml) => find_string(&xml, "HostName")
                .filter(|h| !h.is_empty())
                .or_else(|| {
                    debug!("No HostName key, trying LocalHostName");
                    find_string(&xml, "LocalHostName")
                })
                .filter(|h| !h.is_empty()),
            Err(e) => {
                warn!("Could not read host name: {:#}", e);
                None
            }
        }
    };

    resolved.unwrap_or_else(|| HOSTNAME_ERROR.to_string())
}

/// Resolve the IPv4 address of the system being collected.
///
/// A live system reports the first `inet` address of `en0`; an image is
/// searched for the last `Local IP` line of the Wi-Fi log, then its
/// compressed rotations from newest to oldest.
pub fn resolve_address(input_root: &Path, live: bool) -> String {
    let resolved = if live {
        match capture_output("ifconfig", &["en0"]) {
            Ok(out) => parse_inet(&out),
            Err(e) => {
                debug!("Could not query en0: {:#}", e);
                None
            }
        }
    } else {
        address_from_wifi_logs(&input_root.join(WIFI_LOG))
    };

    resolved.unwrap_or_else(|| ADDRESS_UNKNOWN.to_string())
}

fn address_from_wifi_logs(wifi_log: &Path) -> Option<String> {
    if let Ok(bytes) = fs::read(wifi_log) {
        if let Some(ip) = last_local_ip(&String::from_utf8_lossy(&bytes)) {
            return Some(ip);
        }
    }

    let dir = wifi_log.parent()?;
    let rotation_re = Regex::new(r"^wifi\.log\.(\d+)\.bz2$").ok()?;
    let mut rotations: Vec<(u32, String)> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = rotation_re.captures(&name)?.get(1)?.as_str().parse().ok()?;
            Some((index, entry.path().to_string_lossy().into_owned()))
        })
        .collect();
    rotations.sort();

    rotations.iter().find_map(|(_, path)| {
        capture_output("bzcat", &[path.as_str()])
            .map_err(|e| debug!("Could not decompress {}: {:#}", path, e))
            .ok()
            .and_then(|text| last_local_ip(&text))
    })
}

/// First `inet a.b.c.d` address in `ifconfig` output
pub fn parse_inet(output: &str) -> Option<String> {
    let re = Regex::new(r"inet (\d{1,3}(?:\.\d{1,3}){3})").ok()?;
    re.captures(output).map(|caps| caps[1].to_string())
}

/// Last token of the last line mentioning `Local IP`
pub fn last_local_ip(log_text: &str) -> Option<String> {
    log_text
        .lines()
        .filter(|line| line.contains("Local IP"))
        .last()
        .and_then(|line| line.split_whitespace().last())
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_inet() {
        let out = "en0: flags=8863<UP>\n\tinet6 fe80::1%en0 prefixlen 64\n\tinet 10.1.2.3 netmask 0xffffff00 broadcast 10.1.2.255\n";
        assert_eq!(parse_inet(out).as_deref(), Some("10.1.2.3"));
        assert_eq!(parse_inet("en0: flags=0<>"), None);
    }

    #[test]
    fn test_last_local_ip() {
        let log = "Mon <airportd> Local IP 192.168.1.4\nMon <airportd> noise\nTue <airportd> Local IP 192.168.1.9\n";
        assert_eq!(last_local_ip(log).as_deref(), Some("192.168.1.9"));
        assert_eq!(last_local_ip("nothing here"), None);
    }

    #[test]
    fn test_image_address_from_wifi_log() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join(WIFI_LOG);
        fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        fs::write(&log_path, "x Local IP 172.16.0.7\n").unwrap();

        assert_eq!(resolve_address(temp_dir.path(), false), "172.16.0.7");
    }

    #[test]
    fn test_image_address_fallback() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve_address(temp_dir.path(), false), ADDRESS_UNKNOWN);
    }

    #[test]
    fn test_image_hostname() {
        let temp_dir = TempDir::new().unwrap();
        let plist = temp_dir.path().join(PREFERENCES_PLIST);
        fs::create_dir_all(plist.parent().unwrap()).unwrap();
        fs::write(&plist, "<plist><dict><key>HostName</key><string>fallback-host</string></dict></plist>").unwrap();

        assert_eq!(resolve_hostname(temp_dir.path(), false), "fallback-host");
    }

    #[test]
    fn test_image_hostname_prefers_hostname_key() {
        let temp_dir = TempDir::new().unwrap();
        let plist = temp_dir.path().join(PREFERENCES_PLIST);
        fs::create_dir_all(plist.parent().unwrap()).unwrap();
        fs::write(
            &plist,
            "<plist><dict><key>LocalHostName</key><string>local-host</string>\
             <key>HostName</key><string>full-host</string></dict></plist>",
        )
        .unwrap();
        assert_eq!(resolve_hostname(temp_dir.path(), false), "full-host");

        fs::write(&plist, "<plist><dict><key>LocalHostName</key><string>local-host</string></dict></plist>").unwrap();
        assert_eq!(resolve_hostname(temp_dir.path(), false), "local-host");
    }

    #[test]
    fn test_image_hostname_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve_hostname(temp_dir.path(), false), HOSTNAME_ERROR);
    }
}
