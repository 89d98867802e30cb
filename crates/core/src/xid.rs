//! Transaction identifiers
//!
//! An [`Xid`] follows the X/Open layout: a format id, a global transaction id
//! and a branch qualifier, each id capped at 64 bytes. The benchmark uses one
//! fixed identifier for every cycle, so construction policy (uniqueness,
//! factories) is deliberately absent here.

use crate::error::{LogError, LogResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum size of the global transaction id in bytes
pub const MAX_GLOBAL_ID_SIZE: usize = 64;

/// Maximum size of the branch qualifier in bytes
pub const MAX_BRANCH_QUALIFIER_SIZE: usize = 64;

/// Transaction identifier passed to `prepare` and `commit`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "XidParts")]
pub struct Xid {
    format_id: i32,
    global_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

/// Unvalidated wire shape; deserialization goes through [`Xid::new`]
#[derive(Deserialize)]
struct XidParts {
    format_id: i32,
    global_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl TryFrom<XidParts> for Xid {
    type Error = LogError;

    fn try_from(parts: XidParts) -> LogResult<Self> {
        Xid::new(parts.format_id, parts.global_id, parts.branch_qualifier)
    }
}

fn check_component(component: &'static str, len: usize, max: usize) -> LogResult<()> {
    if len > max {
        return Err(LogError::InvalidXid {
            component,
            len,
            max,
        });
    }
    Ok(())
}

impl Xid {
    /// Create an identifier, rejecting oversized components
    pub fn new(
        format_id: i32,
        global_id: impl Into<Vec<u8>>,
        branch_qualifier: impl Into<Vec<u8>>,
    ) -> LogResult<Self> {
        let global_id = global_id.into();
        let branch_qualifier = branch_qualifier.into();
        check_component("global_id", global_id.len(), MAX_GLOBAL_ID_SIZE)?;
        check_component(
            "branch_qualifier",
            branch_qualifier.len(),
            MAX_BRANCH_QUALIFIER_SIZE,
        )?;

        Ok(Xid {
            format_id,
            global_id,
            branch_qualifier,
        })
    }

    /// The benchmark's default identifier: a full-width zeroed global id
    pub fn zeroed() -> Self {
        Xid {
            format_id: 0,
            global_id: vec![0u8; MAX_GLOBAL_ID_SIZE],
            branch_qualifier: Vec::new(),
        }
    }

    /// Format identifier
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Global transaction id bytes
    pub fn global_id(&self) -> &[u8] {
        &self.global_id
    }

    /// Branch qualifier bytes
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }

    /// Number of bytes this identifier occupies when journaled
    /// (format id + two length prefixes + both ids)
    pub fn encoded_len(&self) -> usize {
        4 + 1 + self.global_id.len() + 1 + self.branch_qualifier.len()
    }

    /// Append the journaled form to `buf`
    ///
    /// Fails without writing anything if a component does not fit its
    /// one-byte length prefix.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> LogResult<()> {
        check_component("global_id", self.global_id.len(), MAX_GLOBAL_ID_SIZE)?;
        check_component(
            "branch_qualifier",
            self.branch_qualifier.len(),
            MAX_BRANCH_QUALIFIER_SIZE,
        )?;

        buf.extend_from_slice(&self.format_id.to_le_bytes());
        buf.push(self.global_id.len() as u8);
        buf.extend_from_slice(&self.global_id);
        buf.push(self.branch_qualifier.len() as u8);
        buf.extend_from_slice(&self.branch_qualifier);
        Ok(())
    }

    /// Decode a journaled identifier, returning it and the bytes consumed
    pub fn decode(bytes: &[u8]) -> LogResult<(Self, usize)> {
        let truncated = || LogError::Corrupt("truncated xid".to_string());

        let format_id = i32::from_le_bytes(
            bytes
                .get(0..4)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(truncated)?,
        );
        let mut pos = 4;

        let gid_len = *bytes.get(pos).ok_or_else(truncated)? as usize;
        pos += 1;
        let global_id = bytes.get(pos..pos + gid_len).ok_or_else(truncated)?.to_vec();
        pos += gid_len;

        let bq_len = *bytes.get(pos).ok_or_else(truncated)? as usize;
        pos += 1;
        let branch_qualifier = bytes.get(pos..pos + bq_len).ok_or_else(truncated)?.to_vec();
        pos += bq_len;

        Ok((Xid::new(format_id, global_id, branch_qualifier)?, pos))
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for b in &self.global_id {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(":")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
