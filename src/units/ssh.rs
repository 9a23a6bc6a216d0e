use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use serde::Serialize;

use crate::models::RunContext;
use crate::output::Record;
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::command::capture_output;

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "ssh",
    version: "1.0.1",
    live_only: false,
    description: "Fingerprints of known_hosts and authorized_keys entries",
    factory: create,
};

const HEADERS: &[&str] = &["src_name", "user", "bits", "fingerprint", "host", "keytype"];

const KEY_FILES: &[&str] = &[".ssh/known_hosts", ".ssh/authorized_keys"];

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(SshKeysUnit { ctx })
}

/// One line of `ssh-keygen -l` output
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeyFingerprint {
    pub bits: String,
    pub fingerprint: String,
    pub host: String,
    pub keytype: String,
}

#[derive(Serialize)]
struct KeyRecord<'a> {
    src_name: &'a str,
    user: &'a str,
    #[serde(flatten)]
    key: &'a KeyFingerprint,
}

pub struct SshKeysUnit {
    ctx: Arc<RunContext>,
}

impl CollectionUnit for SshKeysUnit {
    fn run(&mut self) -> Result<()> {
        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;

        for home in self.ctx.user_homes() {
            for key_file in KEY_FILES {
                let path = home.path.join(key_file);
                if !path.is_file() {
                    debug!("File not found: {}", path.display());
                    continue;
                }
                self.ctx.check_interrupt()?;

                let path_str = path.to_string_lossy();
                let output = match capture_output("ssh-keygen", &["-l", "-f", &path_str]) {
                    Ok(output) => output,
                    Err(e) => {
                        debug!("Could not parse {}: {:#}", path.display(), e);
                        continue;
                    }
                };

                let src_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                for key in parse_fingerprints(&output) {
                    let record = KeyRecord { src_name: &src_name, user: &home.user, key: &key };
                    sink.write_record(Record::from_serialize(&record)?);
                }
            }
        }

        sink.flush();
        info!("Recorded {} SSH key fingerprints", sink.records_written());
        Ok(())
    }
}

/// Parse `bits fingerprint host... (type)` lines
pub fn parse_fingerprints(output: &str) -> Vec<KeyFingerprint> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            Some(KeyFingerprint {
                bits: fields[0].to_string(),
                fingerprint: fields[1].to_string(),
                host: fields[2..fields.len() - 1].join(" "),
                keytype: fields[fields.len() - 1].to_string(),
            })
        })
        .collect()
}
