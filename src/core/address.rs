//! Socket-family device addresses stored in `Address` cells
//!
//! The payload keeps the byte layout of the corresponding Windows
//! `SOCKADDR_*` structures so that INET, INET6, BTH and IRDA values can be
//! handed to a socket without conversion. UNIX stores only the 32-byte
//! path and HYPERV only the two GUIDs; both are expanded on output.

use crate::error::{CellError, Conversion, Result};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;
use uuid::Uuid;

/// Address family codes, stored in the `width` byte of the value tag
pub mod family {
    pub const UNIX: u8 = 1;
    pub const INET: u8 = 2;
    pub const INET6: u8 = 23;
    pub const IRDA: u8 = 26;
    pub const BTH: u8 = 32;
    pub const HYPERV: u8 = 34;
}

/// Bytes of the UNIX path kept in the cell
pub const UNIX_PATH_BYTES: usize = 32;

const IRDA_SERVICE_BYTES: usize = 25;
const PAYLOAD_BYTES: usize = 32;

/// 16-byte GUID in its in-memory (mixed endian) byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Accepts hyphenated, braced, simple and URN GUID text
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Guid::from)
    }

    pub fn to_uuid(self) -> Uuid {
        Uuid::from_bytes_le(self.0)
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Guid(uuid.to_bytes_le())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_uuid().braced(), f)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Device address of any supported family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Inet(SocketAddrV4),
    Inet6(SocketAddrV6),
    /// Path of at most 32 bytes
    Unix(String),
    HyperV { vm_id: Guid, service_id: Guid },
    Bluetooth { address: u64, service_class: Guid, port: u32 },
    /// Service name of at most 25 bytes
    Irda { device_id: [u8; 4], service_name: String },
}

impl Address {
    pub fn family(&self) -> u8 {
        match self {
            Address::Inet(_) => family::INET,
            Address::Inet6(_) => family::INET6,
            Address::Unix(_) => family::UNIX,
            Address::HyperV { .. } => family::HYPERV,
            Address::Bluetooth { .. } => family::BTH,
            Address::Irda { .. } => family::IRDA,
        }
    }

    /// UNIX address, failing if the path does not fit the cell
    pub fn unix(path: &str) -> Result<Self> {
        if path.len() > UNIX_PATH_BYTES {
            return Err(CellError::ValueTooLarge {
                size: path.len(),
                capacity: UNIX_PATH_BYTES,
            });
        }
        Ok(Address::Unix(path.to_string()))
    }

    /// Length of the socket address [`Address::to_sockaddr`] produces for `family`
    ///
    /// The flag tells whether the bytes are stored verbatim in the cell.
    pub fn sockaddr_len(family: u8) -> Option<(usize, bool)> {
        match family {
            family::INET => Some((16, true)),
            family::INET6 => Some((28, true)),
            family::BTH => Some((30, true)),
            family::IRDA => Some((32, true)),
            family::UNIX => Some((2 + UNIX_PATH_BYTES + 1, false)),
            family::HYPERV => Some((36, false)),
            _ => None,
        }
    }

    /// Encode into the 32-byte cell payload
    pub fn write_payload(&self, payload: &mut [u8; PAYLOAD_BYTES]) -> Result<()> {
        *payload = [0u8; PAYLOAD_BYTES];
        let family = (self.family() as u16).to_le_bytes();

        match self {
            Address::Inet(addr) => {
                payload[0..2].copy_from_slice(&family);
                payload[2..4].copy_from_slice(&addr.port().to_be_bytes());
                payload[4..8].copy_from_slice(&addr.ip().octets());
            }
            Address::Inet6(addr) => {
                payload[0..2].copy_from_slice(&family);
                payload[2..4].copy_from_slice(&addr.port().to_be_bytes());
                payload[4..8].copy_from_slice(&addr.flowinfo().to_be_bytes());
                payload[8..24].copy_from_slice(&addr.ip().octets());
                payload[24..28].copy_from_slice(&addr.scope_id().to_le_bytes());
            }
            Address::Unix(path) => {
                if path.len() > UNIX_PATH_BYTES {
                    return Err(CellError::ValueTooLarge {
                        size: path.len(),
                        capacity: UNIX_PATH_BYTES,
                    });
                }
                payload[..path.len()].copy_from_slice(path.as_bytes());
            }
            Address::HyperV { vm_id, service_id } => {
                payload[0..16].copy_from_slice(&vm_id.0);
                payload[16..32].copy_from_slice(&service_id.0);
            }
            Address::Bluetooth {
                address,
                service_class,
                port,
            } => {
                payload[0..2].copy_from_slice(&family);
                payload[2..10].copy_from_slice(&address.to_le_bytes());
                payload[10..26].copy_from_slice(&service_class.0);
                payload[26..30].copy_from_slice(&port.to_le_bytes());
            }
            Address::Irda {
                device_id,
                service_name,
            } => {
                if service_name.len() > IRDA_SERVICE_BYTES {
                    return Err(CellError::ValueTooLarge {
                        size: service_name.len(),
                        capacity: IRDA_SERVICE_BYTES,
                    });
                }
                payload[0..2].copy_from_slice(&family);
                payload[2..6].copy_from_slice(device_id);
                payload[6..6 + service_name.len()].copy_from_slice(service_name.as_bytes());
            }
        }
        Ok(())
    }

    /// Decode a cell payload of the given family
    pub fn from_payload(family: u8, payload: &[u8; PAYLOAD_BYTES]) -> std::result::Result<Self, Conversion> {
        let u16_be = |at: usize| u16::from_be_bytes([payload[at], payload[at + 1]]);
        let u32_le = |at: usize| {
            u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
        };
        let guid = |at: usize| {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&payload[at..at + 16]);
            Guid(bytes)
        };

        match family {
            family::INET => {
                let ip = Ipv4Addr::new(payload[4], payload[5], payload[6], payload[7]);
                Ok(Address::Inet(SocketAddrV4::new(ip, u16_be(2))))
            }
            family::INET6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&payload[8..24]);
                let flowinfo = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                Ok(Address::Inet6(SocketAddrV6::new(
                    Ipv6Addr::from(octets),
                    u16_be(2),
                    flowinfo,
                    u32_le(24),
                )))
            }
            family::UNIX => Ok(Address::Unix(nul_terminated(&payload[..UNIX_PATH_BYTES])?)),
            family::HYPERV => Ok(Address::HyperV {
                vm_id: guid(0),
                service_id: guid(16),
            }),
            family::BTH => {
                let mut address = [0u8; 8];
                address.copy_from_slice(&payload[2..10]);
                Ok(Address::Bluetooth {
                    address: u64::from_le_bytes(address),
                    service_class: guid(10),
                    port: u32_le(26),
                })
            }
            family::IRDA => Ok(Address::Irda {
                device_id: [payload[2], payload[3], payload[4], payload[5]],
                service_name: nul_terminated(&payload[6..6 + IRDA_SERVICE_BYTES])?,
            }),
            _ => Err(Conversion::UnsupportedData),
        }
    }

    /// Full socket address bytes, `SOCKADDR_*` layout
    pub fn to_sockaddr(&self) -> Result<Vec<u8>> {
        let mut payload = [0u8; PAYLOAD_BYTES];
        self.write_payload(&mut payload)?;
        let (length, direct) = Self::sockaddr_len(self.family()).unwrap_or((0, true));
        if direct {
            return Ok(payload[..length].to_vec());
        }

        let mut bytes = vec![0u8; length];
        bytes[0..2].copy_from_slice(&(self.family() as u16).to_le_bytes());
        match self {
            // family, path, terminating NUL
            Address::Unix(_) => bytes[2..2 + UNIX_PATH_BYTES].copy_from_slice(&payload),
            // family, reserved, VmId, ServiceId
            _ => bytes[4..36].copy_from_slice(&payload),
        }
        Ok(bytes)
    }
}

fn nul_terminated(bytes: &[u8]) -> std::result::Result<String, Conversion> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(|_| Conversion::Corrupted)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Inet(addr) => write!(f, "{}", addr),
            Address::Inet6(addr) => write!(f, "{}", addr),
            Address::Unix(path) => write!(f, "unix:{}", path),
            Address::HyperV { vm_id, service_id } => write!(f, "vm:{}:{}", vm_id, service_id),
            Address::Bluetooth {
                address,
                service_class,
                port,
            } => {
                let b = address.to_be_bytes();
                write!(
                    f,
                    "bth:({:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}):{}:{}",
                    b[2], b[3], b[4], b[5], b[6], b[7], service_class, port
                )
            }
            Address::Irda {
                device_id,
                service_name,
            } => write!(
                f,
                "irda:{:02x}{:02x}{:02x}{:02x}:{}",
                device_id[0], device_id[1], device_id[2], device_id[3], service_name
            ),
        }
    }
}

impl FromStr for Address {
    type Err = CellError;

    /// IPv4/IPv6 socket addresses, `unix:<path>` and `vm:<guid>[:<guid>]`
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Some(path) = text.strip_prefix("unix:") {
            return Address::unix(path);
        }
        if let Some(rest) = text.strip_prefix("vm:") {
            let mut guids = rest.splitn(2, ':');
            let vm_id = guids.next().and_then(Guid::parse);
            let service_id = match guids.next() {
                Some(text) => Guid::parse(text),
                None => Some(Guid::default()),
            };
            return match (vm_id, service_id) {
                (Some(vm_id), Some(service_id)) => Ok(Address::HyperV { vm_id, service_id }),
                _ => Err(CellError::UnsupportedValue(format!("invalid Hyper-V address: {}", text))),
            };
        }
        match text.parse::<SocketAddr>() {
            Ok(SocketAddr::V4(addr)) => Ok(Address::Inet(addr)),
            Ok(SocketAddr::V6(addr)) => Ok(Address::Inet6(addr)),
            Err(_) => Err(CellError::UnsupportedValue(format!("invalid address: {}", text))),
        }
    }
}
