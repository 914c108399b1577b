//! Nmap XML report deserialization.
//!
//! Nmap's `-oX <file>` flag writes a structured XML report. This module
//! provides typed Rust structs that deserialize from that XML using
//! `quick-xml` with serde. Every field the presence logic reads is optional
//! so that a partial host entry is skipped later instead of failing the
//! whole report.

use lanwatch_core::AddressKind;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::{MonitorError, Result};

const ROOT_ELEMENT: &str = "nmaprun";

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@scanner")]
    pub scanner: Option<String>,
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "@startstr")]
    pub start_str: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
    pub runstats: Option<RunStats>,
}

/// A single host from scan results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: Option<String>,
    #[serde(rename = "@reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: Option<String>,
    #[serde(rename = "@addrtype")]
    pub addr_type: Option<String>,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStats {
    pub hosts: Option<RunStatsHosts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStatsHosts {
    #[serde(rename = "@up")]
    pub up: Option<String>,
    #[serde(rename = "@down")]
    pub down: Option<String>,
    #[serde(rename = "@total")]
    pub total: Option<String>,
}

impl Address {
    /// The address text, if present and non-blank.
    pub fn value(&self) -> Option<&str> {
        self.addr.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    pub fn is_kind(&self, kind: AddressKind) -> bool {
        self.addr_type
            .as_deref()
            .is_some_and(|t| kind.matches_tag(t.trim()))
    }
}

impl NmapHost {
    /// First address tagged with `kind` that carries a value.
    pub fn first_address(&self, kind: AddressKind) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.is_kind(kind) && a.value().is_some())
    }

    /// Extract the first hostname, if present.
    pub fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()
            .and_then(|hn| hn.hostnames.first())
            .map(|h| h.name.as_str())
    }

    /// Only an explicit `up` state counts; a missing status does not.
    pub fn is_up(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.state.as_deref())
            .is_some_and(|state| state == "up")
    }
}

impl NmapRun {
    /// Hosts-up count as nmap itself reported it.
    pub fn reported_up(&self) -> Option<u32> {
        self.runstats
            .as_ref()
            .and_then(|rs| rs.hosts.as_ref())
            .and_then(|h| h.up.as_deref())
            .and_then(|up| up.parse().ok())
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
///
/// The document must have `<nmaprun>` as its root element.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    match root_element(xml)? {
        Some(name) if name == ROOT_ELEMENT => {}
        Some(name) => {
            return Err(MonitorError::XmlParse(format!(
                "unexpected root element <{name}>, expected <{ROOT_ELEMENT}>"
            )))
        }
        None => {
            return Err(MonitorError::XmlParse(format!(
                "missing <{ROOT_ELEMENT}> root element"
            )))
        }
    }

    quick_xml::de::from_reader(xml).map_err(|e| MonitorError::XmlParse(format!("{e}")))
}

/// Name of the first element in the document.
fn root_element(xml: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(Some(String::from_utf8_lossy(e.name().as_ref()).into_owned()));
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(MonitorError::XmlParse(format!("{e}"))),
        }
        buf.clear();
    }
}
