use std::sync::Arc;

use anyhow::Result;
use log::{error, warn};
use serde::Serialize;

use crate::constants::{GLOBAL_PREFERENCES_PLIST, PREFERENCES_PLIST, SYSTEM_VERSION_PLIST};
use crate::models::RunContext;
use crate::output::Record;
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::command::capture_output;
use crate::utils::plist::{find_array, find_string, read_plist_xml};
use crate::utils::stat::stat_path;

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "systeminfo",
    version: "1.0.2",
    live_only: false,
    description: "Host names, OS build, serial number, time zone and disk encryption state",
    factory: create,
};

const HEADERS: &[&str] = &[
    "local_hostname", "computer_name", "hostname", "model",
    "product_version", "product_build_version", "serial_no", "volume_created",
    "system_tz", "collection_start", "ipaddress", "fvde_status",
];

const TIME_ZONE_KEY: &str = "com.apple.TimeZonePref.Last_Selected_City";

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(SystemInfoUnit { ctx })
}

#[derive(Debug, Default, Serialize)]
pub struct SystemInfoRecord {
    pub local_hostname: Option<String>,
    pub computer_name: Option<String>,
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub product_version: Option<String>,
    pub product_build_version: Option<String>,
    pub serial_no: String,
    pub volume_created: String,
    pub system_tz: String,
    pub collection_start: String,
    pub ipaddress: String,
    pub fvde_status: String,
}

pub struct SystemInfoUnit {
    ctx: Arc<RunContext>,
}

impl SystemInfoUnit {
    fn read_xml(&self, relative: &str) -> Option<String> {
        let path = self.ctx.input_root().join(relative);
        read_plist_xml(&path)
            .map_err(|e| warn!("{:#}", e))
            .ok()
    }

    fn live_time_zone() -> String {
        capture_output("systemsetup", &["-gettimezone"])
            .map(|out| out.trim().trim_start_matches("Time Zone: ").to_string())
            .unwrap_or_else(|e| {
                error!("Could not get system timezone: {:#}", e);
                "ERROR".to_string()
            })
    }

    fn live_fvde_status() -> String {
        match capture_output("fdesetup", &["status"]) {
            Ok(out) if out.contains("On") => "On".to_string(),
            Ok(_) => "Off".to_string(),
            Err(e) => {
                warn!("Could not query FileVault status: {:#}", e);
                "ERROR".to_string()
            }
        }
    }
}

impl CollectionUnit for SystemInfoUnit {
    fn run(&mut self) -> Result<()> {
        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;

        let preferences = self.read_xml(PREFERENCES_PLIST).unwrap_or_default();
        let system_version = self.read_xml(SYSTEM_VERSION_PLIST).unwrap_or_default();
        let identity = &self.ctx.identity;

        let mut record = SystemInfoRecord {
            local_hostname: find_string(&preferences, "LocalHostName"),
            computer_name: find_string(&preferences, "ComputerName"),
            hostname: find_string(&preferences, "HostName"),
            model: find_string(&preferences, "Model"),
            product_version: self.ctx.os_version.clone(),
            product_build_version: find_string(&system_version, "ProductBuildVersion"),
            serial_no: identity.serial.clone(),
            volume_created: stat_path(self.ctx.input_root()).btime,
            collection_start: identity.timestamp(),
            ipaddress: identity.address.clone(),
            ..Default::default()
        };

        if self.ctx.is_live() {
            record.system_tz = Self::live_time_zone();
            record.fvde_status = Self::live_fvde_status();
        } else {
            let global = self.read_xml(GLOBAL_PREFERENCES_PLIST).unwrap_or_default();
            record.system_tz = find_array(&global, TIME_ZONE_KEY)
                .and_then(|city| city.get(3).cloned())
                .unwrap_or_else(|| {
                    error!("Could not get system timezone from {}", GLOBAL_PREFERENCES_PLIST);
                    "ERROR".to_string()
                });
            record.fvde_status = "NA".to_string();
        }

        sink.write_record(Record::from_serialize(&record)?);
        sink.flush();
        Ok(())
    }
}
