//! Parsers for the raw text formats served by the routers

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Device identifier used for the router's WAN interface line
pub const WAN_DEVICE: &str = "wan:";

static MAC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$").unwrap());

/// One cumulative counter reading for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub rx: u64,
    pub tx: u64,
}

/// A single entry from a router's DHCP lease file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    pub mac_address: String,
    pub ip_address: String,
    pub hostname: String,
}

/// Parse the per-station traffic report.
///
/// The router-side script emits one line per wireless station
/// (`"<mac> <rx_bytes> <tx_bytes>"`) and a final `"wan: <rx> <tx>"` line for
/// the WAN interface. Counters are cumulative since the last router reboot.
/// Device identifiers are lowercased; the traffic and lease scripts are free
/// to report MACs in either case. Malformed lines are skipped; an empty or
/// fully garbled payload yields an empty map, which callers treat as "no
/// data this cycle".
pub fn parse_traffic(raw: &str) -> BTreeMap<String, Counters> {
    let mut counters = BTreeMap::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            debug!("Skipping malformed traffic line: {}", line);
            continue;
        }

        let (rx, tx) = match (parts[1].parse::<u64>(), parts[2].parse::<u64>()) {
            (Ok(rx), Ok(tx)) => (rx, tx),
            _ => {
                debug!("Skipping traffic line with non-numeric counters: {}", line);
                continue;
            }
        };

        counters.insert(parts[0].to_ascii_lowercase(), Counters { rx, tx });
    }

    counters
}

/// Parse a dnsmasq-style DHCP lease file.
///
/// IPv4 lines look like `"<expiry> <mac> <ip> <hostname> <client-id>"`. IPv6
/// lines carry an IAID in the MAC's position and the DUID at the end, so the
/// identifier is taken from the fifth field (or the last field) when the
/// second one is not a MAC. Identifiers are lowercased to match the traffic
/// report. A `*` or missing hostname falls back to the IP address. The
/// leading `duid` server line and anything unparseable is skipped.
pub fn parse_leases(raw: &str) -> Vec<LeaseRecord> {
    let mut leases = Vec::new();

    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0] == "duid" {
            continue;
        }
        if parts.len() < 4 {
            debug!("Skipping short lease line: {}", line);
            continue;
        }

        let mac_address = if MAC_RE.is_match(parts[1]) {
            parts[1]
        } else if parts.len() >= 5 && MAC_RE.is_match(parts[4]) {
            parts[4]
        } else if parts.len() >= 5 {
            // IPv6 leases identify the client by DUID in the last field
            parts[parts.len() - 1]
        } else {
            debug!("No usable identifier in lease line: {}", line);
            continue;
        };

        let ip_address = parts[2];
        let hostname = match parts[3] {
            "" | "*" => ip_address,
            name => name,
        };

        leases.push(LeaseRecord {
            mac_address: mac_address.to_ascii_lowercase(),
            ip_address: ip_address.to_string(),
            hostname: hostname.to_string(),
        });
    }

    leases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_station_and_wan_lines() {
        let raw = "aa:bb:cc:dd:ee:ff 1000 2000\n11:22:33:44:55:66 5 7\nwan: 900 100\n";
        let counters = parse_traffic(raw);

        assert_eq!(counters.len(), 3);
        assert_eq!(
            counters["aa:bb:cc:dd:ee:ff"],
            Counters { rx: 1000, tx: 2000 }
        );
        assert_eq!(counters[WAN_DEVICE], Counters { rx: 900, tx: 100 });
    }

    #[test]
    fn skips_malformed_lines_but_keeps_the_rest() {
        let raw = "not-a-mac abc xyz\naa:bb:cc:dd:ee:ff 1000 2000\ntoo few\n";
        let counters = parse_traffic(raw);

        assert_eq!(counters.len(), 1);
        assert!(counters.contains_key("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn lowercases_device_identifiers() {
        let counters = parse_traffic("AA:bb:CC:dd:EE:ff 1 2\n");
        assert!(counters.contains_key("aa:bb:cc:dd:ee:ff"));

        let leases =
            parse_leases("1724000000 AA:BB:CC:DD:EE:FF 192.168.1.50 laptop 01:aa:bb:cc:dd:ee:ff\n");
        assert_eq!(leases[0].mac_address, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn rejects_negative_and_extra_fields() {
        let raw = "AA:BB:CC:DD:EE:FF -5 2000\n11:22:33:44:55:66 1 2 3\n";
        assert!(parse_traffic(raw).is_empty());
    }

    #[test]
    fn empty_payload_yields_empty_map() {
        assert!(parse_traffic("").is_empty());
        assert!(parse_traffic("\n\n").is_empty());
    }

    #[test]
    fn parses_ipv4_lease_line() {
        let raw = "1724000000 aa:bb:cc:dd:ee:ff 192.168.1.50 laptop 01:aa:bb:cc:dd:ee:ff\n";
        let leases = parse_leases(raw);

        assert_eq!(
            leases,
            vec![LeaseRecord {
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                ip_address: "192.168.1.50".to_string(),
                hostname: "laptop".to_string(),
            }]
        );
    }

    #[test]
    fn starred_hostname_falls_back_to_ip() {
        let raw = "1724000000 aa:bb:cc:dd:ee:ff 192.168.1.51 * 01:aa:bb:cc:dd:ee:ff\n";
        let leases = parse_leases(raw);

        assert_eq!(leases[0].hostname, "192.168.1.51");
    }

    #[test]
    fn ipv6_lease_uses_mac_from_fifth_field() {
        let raw = "1724000000 12345678 fd00::5 printer aa:bb:cc:dd:ee:01\n";
        let leases = parse_leases(raw);

        assert_eq!(leases[0].mac_address, "aa:bb:cc:dd:ee:01");
        assert_eq!(leases[0].ip_address, "fd00::5");
    }

    #[test]
    fn ipv6_lease_without_mac_falls_back_to_last_field() {
        let raw = "1724000000 12345678 fd00::6 nas 00:01:00:01:2b:cc:aa:11:aa:bb:cc:dd:ee:02\n";
        let leases = parse_leases(raw);

        assert_eq!(
            leases[0].mac_address,
            "00:01:00:01:2b:cc:aa:11:aa:bb:cc:dd:ee:02"
        );
    }

    #[test]
    fn skips_duid_header_and_short_lines() {
        let raw = "duid 00:01:00:01:2b:cc:aa:11\n1724000000 aa:bb:cc:dd:ee:ff 192.168.1.50 laptop x\nbad line\n";
        let leases = parse_leases(raw);

        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].hostname, "laptop");
    }
}
