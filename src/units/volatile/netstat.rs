use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::models::RunContext;
use crate::output::Record;
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::command::capture_output;

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "netstat",
    version: "1.0.0",
    live_only: true,
    description: "IPv4 sockets and connections reported by netstat",
    factory: create,
};

const HEADERS: &[&str] = &[
    "protocol", "recv_q", "send_q", "src_ip", "src_port", "dst_ip", "dst_port", "state",
];

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(NetstatUnit { ctx })
}

/// One row of `netstat -f inet -n`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub protocol: String,
    pub recv_q: String,
    pub send_q: String,
    pub src_ip: String,
    pub src_port: String,
    pub dst_ip: String,
    pub dst_port: String,
    pub state: String,
}

pub struct NetstatUnit {
    ctx: Arc<RunContext>,
}

impl CollectionUnit for NetstatUnit {
    fn run(&mut self) -> Result<()> {
        if !self.ctx.is_live() {
            error!("Module did not run: input is not a live system!");
            return Ok(());
        }

        let output = capture_output("netstat", &["-f", "inet", "-n"])
            .context("Failed to list network connections")?;

        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;
        for connection in parse_netstat(&output) {
            sink.write_record(Record::from_serialize(&connection)?);
        }
        sink.flush();

        info!("Recorded {} connections", sink.records_written());
        Ok(())
    }
}

/// Parse BSD `netstat -n` output, skipping titles and column headers
pub fn parse_netstat(output: &str) -> Vec<ConnectionRecord> {
    output
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with("Active") && !line.starts_with("Proto"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            let (src_ip, src_port) = split_endpoint(fields[3]);
            let (dst_ip, dst_port) = split_endpoint(fields[4]);
            Some(ConnectionRecord {
                protocol: fields[0].to_string(),
                recv_q: fields[1].to_string(),
                send_q: fields[2].to_string(),
                src_ip,
                src_port,
                dst_ip,
                dst_port,
                state: fields.get(5).map(|s| s.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// BSD netstat joins address and port with a dot: `10.0.0.1.443`
fn split_endpoint(endpoint: &str) -> (String, String) {
    match endpoint.rsplit_once('.') {
        Some((ip, port)) => (ip.to_string(), port.to_string()),
        None => (endpoint.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Active Internet connections
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
tcp4       0      0  192.168.1.20.51234     17.57.146.20.5223      ESTABLISHED
tcp4       0      0  *.22                   *.*                    LISTEN
udp4       0      0  *.5353                 *.*
";

    #[test]
    fn test_parse_netstat() {
        let rows = parse_netstat(SAMPLE);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].protocol, "tcp4");
        assert_eq!(rows[0].src_ip, "192.168.1.20");
        assert_eq!(rows[0].src_port, "51234");
        assert_eq!(rows[0].dst_ip, "17.57.146.20");
        assert_eq!(rows[0].dst_port, "5223");
        assert_eq!(rows[0].state, "ESTABLISHED");

        assert_eq!(rows[1].src_ip, "*");
        assert_eq!(rows[1].src_port, "22");
        assert_eq!(rows[1].dst_ip, "*");
        assert_eq!(rows[2].state, "");
    }
}
