//! Script building blocks: opcodes, CompactSize integers, data pushes and
//! the standard output script templates.

use std::fmt;

pub mod opcode {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    /// OP_1 .. OP_16 are OP_1_BASE + n.
    pub const OP_1_BASE: u8 = 0x50;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
}

use opcode::*;

/// How an output is locked, and therefore how its input must be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    None,
    P2pk,
    P2pkh,
    P2sh,
    P2shP2wpkh,
    P2wpkh,
    P2wsh,
    WitnessUnknown,
}

impl ScriptType {
    const ALL: [ScriptType; 8] = [
        ScriptType::None,
        ScriptType::P2pk,
        ScriptType::P2pkh,
        ScriptType::P2sh,
        ScriptType::P2shP2wpkh,
        ScriptType::P2wpkh,
        ScriptType::P2wsh,
        ScriptType::WitnessUnknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScriptType::None => "none",
            ScriptType::P2pk => "p2pk",
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2sh => "p2sh",
            ScriptType::P2shP2wpkh => "p2sh-p2wpkh",
            ScriptType::P2wpkh => "p2wpkh",
            ScriptType::P2wsh => "p2wsh",
            ScriptType::WitnessUnknown => "witness_unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Spending this script puts the signature in the witness.
    pub fn is_witness_spend(self) -> bool {
        matches!(self, ScriptType::P2wpkh | ScriptType::P2shP2wpkh)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append a Bitcoin CompactSize integer.
pub fn write_compact_size(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn compact_size(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    write_compact_size(&mut buf, value);
    buf
}

/// Read a CompactSize integer, returning the value and bytes consumed.
pub fn read_compact_size(data: &[u8]) -> Option<(u64, usize)> {
    let (&first, rest) = data.split_first()?;
    let width = match first {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        value => return Some((value as u64, 1)),
    };
    let bytes = rest.get(..width)?;
    let mut le = [0u8; 8];
    le[..width].copy_from_slice(bytes);
    Some((u64::from_le_bytes(le), 1 + width))
}

/// Prefix with a CompactSize length, as scripts are stored inside a tx.
pub fn with_length_prefix(script: &[u8]) -> Vec<u8> {
    let mut buf = compact_size(script.len() as u64);
    buf.extend_from_slice(script);
    buf
}

/// Minimal-length push of `data`.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut script = Vec::with_capacity(len + 5);
    if len <= 0x4b {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
    script
}

/// `<pubkey> OP_CHECKSIG`
pub fn p2pk_script(public_key: &[u8]) -> Vec<u8> {
    let mut script = push_data(public_key);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(pubkey_hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    script.extend_from_slice(&push_data(pubkey_hash));
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_script(script_hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_HASH160];
    script.extend_from_slice(&push_data(script_hash));
    script.push(OP_EQUAL);
    script
}

/// `OP_n <program>`
pub fn witness_program_script(version: u8, program: &[u8]) -> Vec<u8> {
    let mut script = vec![if version == 0 { OP_0 } else { OP_1_BASE + version }];
    script.extend_from_slice(&push_data(program));
    script
}
