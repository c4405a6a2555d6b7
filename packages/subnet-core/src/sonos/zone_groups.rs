//! Zone group topology parsing.
//!
//! `GetZoneGroupState` returns the whole household's grouping as an escaped
//! XML document inside the `ZoneGroupState` field. Any speaker can answer it;
//! each device resolves its own block from the full answer.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::sonos::tags::{unescape, Tags};
use crate::sonos::types::GroupMembership;
use crate::sonos::utils::{extract_ip_from_location, get_xml_attr};

/// One `ZoneGroup` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroup {
    pub id: String,
    /// UUID (RINCON_xxx) of the group coordinator.
    pub coordinator_uuid: String,
    pub members: Vec<ZoneGroupMember>,
}

/// A playable member of a zone group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroupMember {
    pub uuid: String,
    pub ip: String,
    pub zone_name: String,
}

impl ZoneGroup {
    fn contains(&self, uuid: &str, ip: &str) -> bool {
        self.members.iter().any(|m| m.uuid == uuid || m.ip == ip)
    }
}

/// Parses unescaped ZoneGroupState XML into its group blocks.
///
/// Only `ZoneGroupMember` elements count as members; home theater
/// satellites nested inside them are not separately addressable. Members
/// without a parsable `Location` are skipped. Malformed XML yields whatever
/// was parsed before the error.
pub fn parse_zone_group_xml(xml: &str) -> Vec<ZoneGroup> {
    let mut groups = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<ZoneGroup> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"ZoneGroup" => {
                    current = Some(ZoneGroup {
                        id: get_xml_attr(e, b"ID").unwrap_or_default(),
                        coordinator_uuid: get_xml_attr(e, b"Coordinator").unwrap_or_default(),
                        members: Vec::new(),
                    });
                }
                b"ZoneGroupMember" => {
                    if let (Some(group), Some(member)) = (current.as_mut(), parse_member(e)) {
                        group.members.push(member);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"ZoneGroup" => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("[Topology] XML parse error in zone groups: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    groups
}

fn parse_member(e: &BytesStart) -> Option<ZoneGroupMember> {
    let uuid = get_xml_attr(e, b"UUID")?;
    let ip = extract_ip_from_location(&get_xml_attr(e, b"Location")?)?;
    let zone_name = get_xml_attr(e, b"ZoneName")
        .map(|z| unescape(&z).into_owned())
        .unwrap_or_default();

    Some(ZoneGroupMember {
        uuid,
        ip,
        zone_name,
    })
}

/// Extracts and parses the zone groups from a `GetZoneGroupState` response.
pub fn parse_zone_group_response(response: &str) -> Vec<ZoneGroup> {
    match response.tag_nonempty("ZoneGroupState") {
        Some(escaped) => parse_zone_group_xml(&unescape(&escaped)),
        None => Vec::new(),
    }
}

/// Resolves the group membership of one device from a `GetZoneGroupState`
/// response.
///
/// The device's block is the first whose members include `self_uuid` or
/// `self_ip`. Finding no block is not an error: the device is reported as
/// a standalone coordinator with no known members.
pub fn resolve_group(response: &str, self_uuid: &str, self_ip: &str) -> GroupMembership {
    let groups = parse_zone_group_response(response);

    let Some(group) = groups.iter().find(|g| g.contains(self_uuid, self_ip)) else {
        log::trace!("[Topology] {} not found in zone group state", self_ip);
        return GroupMembership::default();
    };

    GroupMembership {
        is_coordinator: group.coordinator_uuid == self_uuid,
        members: group.members.iter().map(|m| m.ip.clone()).collect(),
    }
}
