//! Raw transaction building and signing, legacy and segwit (BIP-143).
//!
//! A [`MutableTransaction`] collects inputs and outputs; [`MutableTransaction::sign`]
//! produces a [`SignedTransaction`] that can be serialized and broadcast. A
//! dummy transaction signs with zeroed placeholders so its size can be
//! measured before real keys are used.

use crypto_utils::digest::{hash160, sha256d};
use crypto_utils::secp256k1::{
    COMPRESSED_PUBLIC_KEY_SIZE, SIGNATURE_MAX_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE,
};
use crypto_utils::{PrivateKey, PublicKey};
use tracing::debug;

use crate::address::{Address, AddressKind, AddressType};
use crate::error::BtcError;
use crate::script::{self, opcode, ScriptType};
use crate::utxo::Utxo;

pub const TX_VERSION: u32 = 1;
pub const SIGHASH_ALL: u32 = 1;
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

const WITNESS_MARKER: [u8; 2] = [0x00, 0x01];

/// Snapshot of the key material of the address owning a UTXO.
#[derive(Debug, Clone)]
pub struct InputKey {
    pub address_type: AddressType,
    pub hash: Vec<u8>,
    pub private_key: Option<PrivateKey>,
    pub public_key: Option<PublicKey>,
}

impl InputKey {
    pub fn from_address(address: &Address) -> Self {
        Self {
            address_type: *address.address_type(),
            hash: address.hash().to_vec(),
            private_key: address.private_key().cloned(),
            public_key: address.public_key(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutableInput {
    utxo: Utxo,
    key: InputKey,
    sequence: u32,
    hash_type: u32,
}

impl MutableInput {
    pub fn new(utxo: Utxo, key: InputKey) -> Self {
        Self {
            utxo,
            key,
            sequence: DEFAULT_SEQUENCE,
            hash_type: SIGHASH_ALL,
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn amount(&self) -> i64 {
        self.utxo.amount()
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn hash_type(&self) -> u32 {
        self.hash_type
    }

    pub fn script_type(&self) -> ScriptType {
        self.utxo
            .script_type()
            .unwrap_or(self.key.address_type.script_type)
    }

    pub fn is_witness(&self) -> bool {
        self.script_type().is_witness_spend()
    }

    fn public_key(&self) -> Option<PublicKey> {
        self.key
            .public_key
            .clone()
            .or_else(|| self.key.private_key.as_ref().map(PrivateKey::public_key))
    }

    fn key_hash(&self) -> Result<Vec<u8>, BtcError> {
        if let Some(public_key) = self.public_key() {
            return Ok(hash160(&public_key.data()).to_vec());
        }
        match self.key.address_type.kind {
            AddressKind::PubkeyHash | AddressKind::WitnessV0KeyHash if self.key.hash.len() == 20 => {
                Ok(self.key.hash.clone())
            }
            _ => Err(BtcError::MissingPrivateKey(self.utxo_label())),
        }
    }

    /// Script committed to by the signature hash, without length prefix.
    fn script_code(&self) -> Result<Vec<u8>, BtcError> {
        match self.script_type() {
            ScriptType::P2pk => {
                let public_key = self
                    .public_key()
                    .ok_or_else(|| BtcError::MissingPrivateKey(self.utxo_label()))?;
                Ok(script::p2pk_script(&public_key.data()))
            }
            ScriptType::P2pkh | ScriptType::P2wpkh | ScriptType::P2shP2wpkh => {
                Ok(script::p2pkh_script(&self.key_hash()?))
            }
            other => Err(BtcError::TransactionBuildError(format!(
                "cannot spend {other} output {}",
                self.utxo_label()
            ))),
        }
    }

    fn utxo_label(&self) -> String {
        format!("{}:{}", self.utxo.name(), self.utxo.index())
    }
}

/// A payment to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableOutput {
    address_name: String,
    script_pubkey: Vec<u8>,
    amount: i64,
}

impl MutableOutput {
    pub fn new(address: &Address, amount: i64) -> Result<Self, BtcError> {
        if amount < 0 {
            return Err(BtcError::InvalidAmount(amount.to_string()));
        }
        let script_pubkey = match address.script_pubkey() {
            Some(script) => script,
            None if address.is_null_data() => vec![opcode::OP_RETURN],
            None => return Err(BtcError::InvalidAddress(address.name().to_string())),
        };
        Ok(Self {
            address_name: address.name().to_string(),
            script_pubkey,
            amount,
        })
    }

    pub fn address_name(&self) -> &str {
        &self.address_name
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn script_pubkey(&self) -> &[u8] {
        &self.script_pubkey
    }

    fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&script::with_length_prefix(&self.script_pubkey));
    }
}

#[derive(Debug, Clone)]
pub struct MutableTransaction {
    version: u32,
    lock_time: u32,
    is_dummy: bool,
    inputs: Vec<MutableInput>,
    outputs: Vec<MutableOutput>,
    amount: i64,
    fee_amount: i64,
}

impl MutableTransaction {
    pub fn new(lock_time: u32, is_dummy: bool) -> Self {
        Self {
            version: TX_VERSION,
            lock_time,
            is_dummy,
            inputs: Vec::new(),
            outputs: Vec::new(),
            amount: 0,
            fee_amount: 0,
        }
    }

    pub fn add_input(&mut self, input: MutableInput) {
        self.inputs.push(input);
        self.recalculate();
    }

    pub fn add_output(&mut self, output: MutableOutput) {
        self.outputs.push(output);
        self.recalculate();
    }

    fn recalculate(&mut self) {
        // Dummy change outputs carry the maximum value.
        self.amount = self
            .inputs
            .iter()
            .fold(0i64, |sum, input| sum.saturating_add(input.amount()));
        let spent = self
            .outputs
            .iter()
            .fold(0i64, |sum, output| sum.saturating_add(output.amount));
        self.fee_amount = self.amount.saturating_sub(spent);
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn inputs(&self) -> &[MutableInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[MutableOutput] {
        &self.outputs
    }

    /// Sum of the spent UTXOs.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn fee_amount(&self) -> i64 {
        self.fee_amount
    }

    pub fn is_witness(&self) -> bool {
        self.inputs.iter().any(MutableInput::is_witness)
    }

    /// Digest signed by input `index`.
    pub fn signature_hash(&self, index: usize) -> Result<[u8; 32], BtcError> {
        let input = self
            .inputs
            .get(index)
            .ok_or(BtcError::InputIndexOutOfRange(index))?;
        if input.is_witness() {
            self.witness_signature_hash(input)
        } else {
            self.legacy_signature_hash(index, input)
        }
    }

    fn legacy_signature_hash(&self, index: usize, input: &MutableInput) -> Result<[u8; 32], BtcError> {
        let script_code = input.script_code()?;

        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        script::write_compact_size(&mut buf, self.inputs.len() as u64);
        for (i, other) in self.inputs.iter().enumerate() {
            buf.extend_from_slice(&other.utxo.outpoint()?);
            if i == index {
                buf.extend_from_slice(&script::with_length_prefix(&script_code));
            } else {
                script::write_compact_size(&mut buf, 0);
            }
            buf.extend_from_slice(&other.sequence.to_le_bytes());
        }
        self.write_outputs(&mut buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&input.hash_type.to_le_bytes());
        Ok(sha256d(&buf))
    }

    fn witness_signature_hash(&self, input: &MutableInput) -> Result<[u8; 32], BtcError> {
        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for other in &self.inputs {
            prevouts.extend_from_slice(&other.utxo.outpoint()?);
            sequences.extend_from_slice(&other.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for output in &self.outputs {
            output.write(&mut outputs);
        }

        let mut buf = Vec::with_capacity(156);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&sha256d(&prevouts));
        buf.extend_from_slice(&sha256d(&sequences));
        buf.extend_from_slice(&input.utxo.outpoint()?);
        buf.extend_from_slice(&script::with_length_prefix(&input.script_code()?));
        buf.extend_from_slice(&input.amount().to_le_bytes());
        buf.extend_from_slice(&input.sequence.to_le_bytes());
        buf.extend_from_slice(&sha256d(&outputs));
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&input.hash_type.to_le_bytes());
        Ok(sha256d(&buf))
    }

    fn write_outputs(&self, buf: &mut Vec<u8>) {
        script::write_compact_size(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(buf);
        }
    }

    /// Sign every input. Each input uses the key of its own address.
    pub fn sign(&self) -> Result<SignedTransaction, BtcError> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for (index, input) in self.inputs.iter().enumerate() {
            let (signature, public_key) = if self.is_dummy {
                Self::dummy_signature(input)
            } else {
                let private_key = input
                    .key
                    .private_key
                    .as_ref()
                    .ok_or_else(|| BtcError::MissingPrivateKey(input.utxo_label()))?;
                let digest = self.signature_hash(index)?;
                let mut signature = private_key
                    .sign(&digest)
                    .map_err(|e| BtcError::SigningError(e.to_string()))?;
                signature.push(input.hash_type as u8);
                (signature, private_key.public_key().data())
            };

            let (script_sig, witness) = match input.script_type() {
                ScriptType::P2wpkh => (Vec::new(), vec![signature, public_key]),
                ScriptType::P2shP2wpkh => {
                    let redeem = script::witness_program_script(0, &hash160(&public_key));
                    (script::push_data(&redeem), vec![signature, public_key])
                }
                ScriptType::P2pk => (script::push_data(&signature), Vec::new()),
                ScriptType::P2pkh => {
                    let mut script_sig = script::push_data(&signature);
                    script_sig.extend_from_slice(&script::push_data(&public_key));
                    (script_sig, Vec::new())
                }
                other => {
                    return Err(BtcError::SigningError(format!(
                        "cannot sign {other} input {}",
                        input.utxo_label()
                    )))
                }
            };

            inputs.push(SignedInput {
                outpoint: input.utxo.outpoint()?,
                script_sig,
                sequence: input.sequence,
                witness,
            });
        }

        debug!(
            inputs = inputs.len(),
            outputs = self.outputs.len(),
            dummy = self.is_dummy,
            "transaction signed"
        );
        Ok(SignedTransaction {
            version: self.version,
            lock_time: self.lock_time,
            is_dummy: self.is_dummy,
            is_witness: self.is_witness(),
            inputs,
            outputs: self.outputs.clone(),
            amount: self.amount,
            fee_amount: self.fee_amount,
        })
    }

    fn dummy_signature(input: &MutableInput) -> (Vec<u8>, Vec<u8>) {
        let mut signature = vec![0u8; SIGNATURE_MAX_SIZE];
        signature.push(input.hash_type as u8);
        let compressed = input.public_key().map_or(true, |k| k.is_compressed());
        let public_key_size = if compressed {
            COMPRESSED_PUBLIC_KEY_SIZE
        } else {
            UNCOMPRESSED_PUBLIC_KEY_SIZE
        };
        (signature, vec![0u8; public_key_size])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SignedInput {
    outpoint: Vec<u8>,
    script_sig: Vec<u8>,
    sequence: u32,
    witness: Vec<Vec<u8>>,
}

/// A fully signed transaction, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    version: u32,
    lock_time: u32,
    is_dummy: bool,
    is_witness: bool,
    inputs: Vec<SignedInput>,
    outputs: Vec<MutableOutput>,
    amount: i64,
    fee_amount: i64,
}

impl SignedTransaction {
    /// Wire serialization; the witness section is included only when
    /// requested and some input spends a witness output.
    pub fn raw(&self, with_witness: bool) -> Vec<u8> {
        let with_witness = with_witness && self.is_witness;
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        if with_witness {
            buf.extend_from_slice(&WITNESS_MARKER);
        }
        script::write_compact_size(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.outpoint);
            buf.extend_from_slice(&script::with_length_prefix(&input.script_sig));
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        script::write_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(&mut buf);
        }
        if with_witness {
            for input in &self.inputs {
                script::write_compact_size(&mut buf, input.witness.len() as u64);
                for item in &input.witness {
                    buf.extend_from_slice(&script::with_length_prefix(item));
                }
            }
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.raw(true))
    }

    pub fn raw_size(&self) -> usize {
        self.raw(true).len()
    }

    pub fn virtual_size(&self) -> usize {
        if !self.is_witness {
            return self.raw_size();
        }
        let base = self.raw(false).len();
        (3 * base + self.raw_size()).div_ceil(4)
    }

    /// Transaction id in display order. Dummy transactions have none.
    pub fn name(&self) -> Option<String> {
        if self.is_dummy {
            return None;
        }
        let mut hash = sha256d(&self.raw(false));
        hash.reverse();
        Some(hex::encode(hash))
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn is_witness(&self) -> bool {
        self.is_witness
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn fee_amount(&self) -> i64 {
        self.fee_amount
    }

    pub fn outputs(&self) -> &[MutableOutput] {
        &self.outputs
    }
}
