//! `connection` class (id 10): the per-socket handshake and teardown.

use crate::error::Result;
use crate::reader::Reader;
use crate::value::FieldTable;
use crate::writer::{assert, Writer};

/// `connection.start` (class 10, method 10).
#[derive(Debug, Clone, PartialEq)]
pub struct Start {
    /// Protocol major version the server implements (always 0).
    pub version_major: u8,
    /// Protocol minor version the server implements (always 9).
    pub version_minor: u8,
    /// Server metadata (product, version, platform, capabilities...).
    pub server_properties: FieldTable,
    /// Space-separated list of supported SASL mechanisms.
    pub mechanisms: String,
    /// Space-separated list of supported locales.
    pub locales: String,
}

impl Start {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            version_major: reader.u8(&format!("{path}.version_major"))?,
            version_minor: reader.u8(&format!("{path}.version_minor"))?,
            server_properties: reader.table(&format!("{path}.server_properties"))?,
            mechanisms: reader.longstr(&format!("{path}.mechanisms"))?,
            locales: reader.longstr(&format!("{path}.locales"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u8(self.version_major);
        writer.u8(self.version_minor);
        writer.table(&self.server_properties);
        writer.longstr(&self.mechanisms);
        writer.longstr(&self.locales);
        Ok(())
    }
}

/// `connection.start-ok` (class 10, method 11).
#[derive(Debug, Clone, PartialEq)]
pub struct StartOk {
    /// Client metadata.
    pub client_properties: FieldTable,
    /// The single SASL mechanism the client chose.
    pub mechanism: String,
    /// SASL response payload (e.g. `\0user\0password` for `PLAIN`).
    pub response: String,
    /// The single locale the client chose.
    pub locale: String,
}

impl StartOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            client_properties: reader.table(&format!("{path}.client_properties"))?,
            mechanism: reader.shortstr(&format!("{path}.mechanism"))?,
            response: reader.longstr(&format!("{path}.response"))?,
            locale: reader.shortstr(&format!("{path}.locale"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.table(&self.client_properties);
        writer.shortstr(&self.mechanism, "mechanism")?;
        writer.longstr(&self.response);
        writer.shortstr(&self.locale, "locale")?;
        Ok(())
    }
}

/// `connection.secure` (class 10, method 20): a SASL challenge round-trip,
/// used by mechanisms beyond the initial response.
#[derive(Debug, Clone, PartialEq)]
pub struct Secure {
    /// Opaque challenge bytes from the server.
    pub challenge: String,
}

impl Secure {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { challenge: reader.longstr(&format!("{path}.challenge"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.longstr(&self.challenge);
        Ok(())
    }
}

/// `connection.secure-ok` (class 10, method 21).
#[derive(Debug, Clone, PartialEq)]
pub struct SecureOk {
    /// Opaque response bytes to the server's challenge.
    pub response: String,
}

impl SecureOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { response: reader.longstr(&format!("{path}.response"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.longstr(&self.response);
        Ok(())
    }
}

/// `connection.tune` (class 10, method 30): the server's proposed limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Tune {
    /// Maximum number of channels the server allows, `0` for none.
    pub channel_max: u16,
    /// Maximum frame payload size the server allows, `0` for none.
    pub frame_max: u32,
    /// Desired heartbeat interval in seconds, `0` to disable.
    pub heartbeat: u16,
}

impl Tune {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            channel_max: reader.u16(&format!("{path}.channel_max"))?,
            frame_max: reader.u32(&format!("{path}.frame_max"))?,
            heartbeat: reader.u16(&format!("{path}.heartbeat"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(self.channel_max);
        writer.u32(self.frame_max);
        writer.u16(self.heartbeat);
        Ok(())
    }
}

/// `connection.tune-ok` (class 10, method 31): the client's negotiated
/// limits, each the minimum of what it wants and what the server proposed.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneOk {
    /// Negotiated channel-max.
    pub channel_max: u16,
    /// Negotiated frame-max.
    pub frame_max: u32,
    /// Negotiated heartbeat interval in seconds.
    pub heartbeat: u16,
}

impl TuneOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            channel_max: reader.u16(&format!("{path}.channel_max"))?,
            frame_max: reader.u32(&format!("{path}.frame_max"))?,
            heartbeat: reader.u16(&format!("{path}.heartbeat"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(self.channel_max);
        writer.u32(self.frame_max);
        writer.u16(self.heartbeat);
        Ok(())
    }
}

/// `connection.open` (class 10, method 40).
#[derive(Debug, Clone, PartialEq)]
pub struct Open {
    /// Virtual host to connect to.
    pub virtual_host: String,
}

impl Open {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        let virtual_host = reader.shortstr(&format!("{path}.virtual_host"))?;
        reader.shortstr(&format!("{path}.reserved_capabilities"))?;
        reader.boolean(&format!("{path}.reserved_insist"))?;
        Ok(Self { virtual_host })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        assert::notnull_str(&self.virtual_host, "virtual_host")?;
        writer.shortstr(&self.virtual_host, "virtual_host")?;
        writer.shortstr("", "reserved_capabilities")?;
        writer.boolean(false);
        Ok(())
    }
}

/// `connection.open-ok` (class 10, method 41).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenOk;

impl OpenOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.shortstr(&format!("{path}.reserved_known_hosts"))?;
        Ok(Self)
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr("", "reserved_known_hosts")?;
        Ok(())
    }
}

/// `connection.close` (class 10, method 50): either side may send this to
/// begin a graceful (or forced) shutdown of the whole connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Close {
    /// Reply code; see spec.md §6 for the standard set.
    pub reply_code: u16,
    /// Human-readable reason.
    pub reply_text: String,
    /// Class of the method that caused the close, or 0.
    pub class_id: u16,
    /// Id of the method that caused the close, or 0.
    pub method_id: u16,
}

impl Close {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            reply_code: reader.u16(&format!("{path}.reply_code"))?,
            reply_text: reader.shortstr(&format!("{path}.reply_text"))?,
            class_id: reader.u16(&format!("{path}.class_id"))?,
            method_id: reader.u16(&format!("{path}.method_id"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(self.reply_code);
        writer.shortstr(&self.reply_text, "reply_text")?;
        writer.u16(self.class_id);
        writer.u16(self.method_id);
        Ok(())
    }
}

/// `connection.blocked` (class 10, method 60): a RabbitMQ extension telling
/// the client the broker is refusing to read further content on this
/// connection (usually a resource alarm) until `connection.unblocked`.
#[derive(Debug, Clone, PartialEq)]
pub struct Blocked {
    /// Human-readable reason, e.g. `"low on memory"`.
    pub reason: String,
}

impl Blocked {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { reason: reader.shortstr(&format!("{path}.reason"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.reason, "reason")?;
        Ok(())
    }
}

/// `connection.unblocked` (class 10, method 61): clears a prior `blocked`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Unblocked;

impl Unblocked {
    pub(crate) fn decode(_reader: &mut Reader<'_>, _path: &str) -> Result<Self> {
        Ok(Self)
    }

    pub(crate) fn encode(&self, _writer: &mut Writer) -> Result<()> {
        Ok(())
    }
}

/// `connection.update-secret` (class 10, method 70): a RabbitMQ extension
/// for rotating the credential on a live connection (e.g. a short-lived
/// OAuth token). Not implemented by this client; see spec.md §4.4.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSecret {
    /// The new secret.
    pub new_secret: String,
    /// Reason for the update.
    pub reason: String,
}

impl UpdateSecret {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            new_secret: reader.longstr(&format!("{path}.new_secret"))?,
            reason: reader.shortstr(&format!("{path}.reason"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.longstr(&self.new_secret);
        writer.shortstr(&self.reason, "reason")?;
        Ok(())
    }
}

/// `connection.update-secret-ok` (class 10, method 71).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSecretOk;

impl UpdateSecretOk {
    pub(crate) fn decode(_reader: &mut Reader<'_>, _path: &str) -> Result<Self> {
        Ok(Self)
    }

    pub(crate) fn encode(&self, _writer: &mut Writer) -> Result<()> {
        Ok(())
    }
}
