//! # BIOS Command Handler
//!
//! Decodes the five BIOS command payloads, drives the table subsystem, and
//! encodes protocol responses. The handler owns the process-lifetime table
//! cache: tables are loaded (or rebuilt from definitions) lazily on first
//! access, every read and write of them is serialized under one coarse
//! mutex, and the cache is refreshed by successful sets and dropped by an
//! explicit invalidation on external config change.
//!
//! A successful set persists the mutated value table before the response is
//! encoded, so an acknowledged write is durable; persistence goes through
//! the store's atomic replace, so a failed write leaves the previous table
//! as the source of truth.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::codec::datetime;
use crate::definitions::AttributeDefinition;
use crate::error::{BiosError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::message::{
    self, cc_only, opcode, CompletionCode, GetAttributeRequest, GetTableRequest,
    SetAttributeRequest, SetDateTimeRequest, TRANSFER_GET_FIRST_PART, TRANSFER_START_AND_END,
};
use crate::storage::TableStore;
use crate::table::accessor;
use crate::table::builder;
use crate::table::{validate, TableKind};

/// The three sealed table buffers held by the cache.
struct CachedTables {
    string: Vec<u8>,
    attribute: Vec<u8>,
    value: Vec<u8>,
}

impl CachedTables {
    fn sealed(&self, kind: TableKind) -> &[u8] {
        match kind {
            TableKind::String => &self.string,
            TableKind::Attribute => &self.attribute,
            TableKind::AttributeValue => &self.value,
        }
    }
}

/// Responder for the BIOS command family.
pub struct BiosHandler {
    store: Arc<dyn TableStore>,
    definitions: Vec<AttributeDefinition>,
    tables: Mutex<Option<CachedTables>>,
    last_set_time: Mutex<Option<i64>>,
}

impl BiosHandler {
    pub fn new(store: Arc<dyn TableStore>, definitions: Vec<AttributeDefinition>) -> Self {
        BiosHandler {
            store,
            definitions,
            tables: Mutex::new(None),
            last_set_time: Mutex::new(None),
        }
    }

    /// Drop the cached tables; the next command rebuilds or reloads them.
    /// Called on external configuration change.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.tables.lock() {
            *guard = None;
        }
    }

    /// Epoch seconds most recently accepted by SetDateTime, if any.
    pub fn last_set_time(&self) -> Option<i64> {
        self.last_set_time.lock().ok().and_then(|g| *g)
    }

    /// Register all five commands on a dispatcher.
    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) -> Result<()> {
        let h = Arc::clone(self);
        dispatcher.register(opcode::GET_DATE_TIME, move |p| h.get_date_time(p))?;
        let h = Arc::clone(self);
        dispatcher.register(opcode::SET_DATE_TIME, move |p| h.set_date_time(p))?;
        let h = Arc::clone(self);
        dispatcher.register(opcode::GET_BIOS_TABLE, move |p| h.get_bios_table(p))?;
        let h = Arc::clone(self);
        dispatcher.register(opcode::GET_BIOS_ATTRIBUTE_CURRENT_VALUE_BY_HANDLE, move |p| {
            h.get_attribute_current_value(p)
        })?;
        let h = Arc::clone(self);
        dispatcher.register(opcode::SET_BIOS_ATTRIBUTE_CURRENT_VALUE, move |p| {
            h.set_attribute_current_value(p)
        })?;
        Ok(())
    }

    // -- commands ----------------------------------------------------------

    pub fn get_date_time(&self, payload: &[u8]) -> Vec<u8> {
        respond("GetDateTime", self.try_get_date_time(payload))
    }

    fn try_get_date_time(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if !payload.is_empty() {
            return Err(BiosError::InvalidLength {
                expected: 0,
                got: payload.len(),
            });
        }
        let now = chrono::Utc::now().timestamp();
        let time = datetime::epoch_to_bcd_time(now)?;
        Ok(message::date_time_response(&time))
    }

    pub fn set_date_time(&self, payload: &[u8]) -> Vec<u8> {
        respond("SetDateTime", self.try_set_date_time(payload))
    }

    fn try_set_date_time(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let req = SetDateTimeRequest::decode(payload)?;
        let epoch = datetime::bcd_time_to_epoch(&req.time)?;
        let mut guard = self
            .last_set_time
            .lock()
            .map_err(|_| BiosError::Custom("time lock poisoned".to_string()))?;
        *guard = Some(epoch);
        info!(epoch, "Accepted platform date/time");
        Ok(cc_only(CompletionCode::Success))
    }

    pub fn get_bios_table(&self, payload: &[u8]) -> Vec<u8> {
        respond("GetBIOSTable", self.try_get_bios_table(payload))
    }

    fn try_get_bios_table(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let req = GetTableRequest::decode(payload)?;
        let kind = TableKind::from_type_byte(req.table_type)
            .ok_or(BiosError::InvalidTableType(req.table_type))?;
        if req.transfer_op != TRANSFER_GET_FIRST_PART {
            return Err(BiosError::InvalidTransferOperation(req.transfer_op));
        }
        self.with_tables(|tables| Ok(message::transfer_response(tables.sealed(kind))))
    }

    pub fn get_attribute_current_value(&self, payload: &[u8]) -> Vec<u8> {
        respond(
            "GetBIOSAttributeCurrentValueByHandle",
            self.try_get_attribute_current_value(payload),
        )
    }

    fn try_get_attribute_current_value(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let req = GetAttributeRequest::decode(payload)?;
        if req.transfer_op != TRANSFER_GET_FIRST_PART {
            return Err(BiosError::InvalidTransferOperation(req.transfer_op));
        }
        self.with_tables(|tables| {
            let attr_region = validate(TableKind::Attribute, &tables.attribute)?;
            let value_region = validate(TableKind::AttributeValue, &tables.value)?;
            let entry = accessor::get_current_value(attr_region, value_region, req.attribute_handle)?;
            Ok(message::transfer_response(entry.raw()))
        })
    }

    pub fn set_attribute_current_value(&self, payload: &[u8]) -> Vec<u8> {
        respond(
            "SetBIOSAttributeCurrentValue",
            self.try_set_attribute_current_value(payload),
        )
    }

    fn try_set_attribute_current_value(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let req = SetAttributeRequest::decode(payload)?;
        if req.transfer_flag != TRANSFER_START_AND_END {
            return Err(BiosError::InvalidTransferOperation(req.transfer_flag));
        }
        let handle = u16::from_le_bytes([req.entry[0], req.entry[1]]);
        self.with_tables(|tables| {
            let attr_region = validate(TableKind::Attribute, &tables.attribute)?;
            let value_region = validate(TableKind::AttributeValue, &tables.value)?;
            let sealed = accessor::set_current_value(attr_region, value_region, req.entry)?;
            // Durability before acknowledgement: persist, then swap the cache.
            self.store.store(TableKind::AttributeValue, &sealed)?;
            tables.value = sealed;
            info!(handle, "Updated attribute current value");
            Ok(message::set_attribute_response())
        })
    }

    // -- table cache -------------------------------------------------------

    /// Run `f` with the cached tables under the table lock, loading or
    /// rebuilding them first if the cache is empty. The lock is released on
    /// every exit path, including validation and I/O failures inside `f`.
    fn with_tables<R>(&self, f: impl FnOnce(&mut CachedTables) -> Result<R>) -> Result<R> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| BiosError::Custom("table lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.load_or_rebuild()?);
        }
        match guard.as_mut() {
            Some(tables) => f(tables),
            None => Err(BiosError::Custom("table cache empty after load".to_string())),
        }
    }

    /// Load all three persisted tables; any missing or checksum-failing
    /// table triggers a full rebuild from definitions, never a partial
    /// repair.
    fn load_or_rebuild(&self) -> Result<CachedTables> {
        let mut loaded: Vec<Vec<u8>> = Vec::with_capacity(3);
        let mut complete = true;
        for kind in [TableKind::String, TableKind::Attribute, TableKind::AttributeValue] {
            match self.store.load(kind)? {
                Some(bytes) => match validate(kind, &bytes) {
                    Ok(_) => loaded.push(bytes),
                    Err(e) => {
                        warn!(table = %kind, error = %e, "Persisted table failed validation, rebuilding");
                        complete = false;
                        break;
                    }
                },
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            let mut it = loaded.into_iter();
            if let (Some(string), Some(attribute), Some(value)) = (it.next(), it.next(), it.next())
            {
                return Ok(CachedTables {
                    string,
                    attribute,
                    value,
                });
            }
        }
        if self.definitions.is_empty() {
            return Err(BiosError::TableUnavailable(TableKind::Attribute));
        }
        let built = builder::build_and_store(&self.definitions, self.store.as_ref())?;
        Ok(CachedTables {
            string: built.string_table,
            attribute: built.attribute_table,
            value: built.value_table,
        })
    }
}

/// Fold a command result into a wire response, logging failures. Expected
/// rejections (validation, lookup) log at warn; everything else is an
/// internal fault.
fn respond(command: &str, result: Result<Vec<u8>>) -> Vec<u8> {
    match result {
        Ok(resp) => resp,
        Err(e) => {
            let cc = CompletionCode::from(&e);
            match cc {
                CompletionCode::Error => error!(command, error = %e, "Command failed"),
                _ => warn!(command, error = %e, code = cc.byte(), "Command rejected"),
            }
            cc_only(cc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::DefinitionKind;
    use crate::storage::MemStore;

    fn handler() -> Arc<BiosHandler> {
        let defs = vec![AttributeDefinition {
            name: "BootMode".to_string(),
            kind: DefinitionKind::Enumeration {
                possible_values: vec!["Legacy".to_string(), "UEFI".to_string()],
                default_values: vec!["UEFI".to_string()],
            },
        }];
        Arc::new(BiosHandler::new(Arc::new(MemStore::new()), defs))
    }

    #[test]
    fn get_date_time_rejects_payload() {
        let h = handler();
        let resp = h.get_date_time(&[1]);
        assert_eq!(resp, vec![CompletionCode::InvalidLength.byte()]);
    }

    #[test]
    fn get_date_time_is_bcd() {
        let h = handler();
        let resp = h.get_date_time(&[]);
        assert_eq!(resp.len(), 8);
        assert_eq!(resp[0], CompletionCode::Success.byte());
        // every field must decode as BCD
        for b in &resp[1..6] {
            assert!(crate::codec::bcd_to_dec8(*b).is_ok());
        }
    }

    #[test]
    fn set_date_time_round_trips_through_state() {
        let h = handler();
        // 2023-01-15T10:30:45Z
        let payload = [0x45, 0x30, 0x10, 0x15, 0x01, 0x23, 0x20];
        let resp = h.set_date_time(&payload);
        assert_eq!(resp, vec![CompletionCode::Success.byte()]);
        assert_eq!(h.last_set_time(), Some(1_673_778_645));
    }

    #[test]
    fn set_date_time_rejects_bad_length_and_fields() {
        let h = handler();
        assert_eq!(
            h.set_date_time(&[0; 6]),
            vec![CompletionCode::InvalidLength.byte()]
        );
        // month 13
        let bad = [0x00, 0x00, 0x00, 0x01, 0x13, 0x23, 0x20];
        assert_eq!(
            h.set_date_time(&bad),
            vec![CompletionCode::InvalidData.byte()]
        );
        assert_eq!(h.last_set_time(), None);
    }

    #[test]
    fn get_bios_table_rejects_unknown_type() {
        let h = handler();
        let payload = [0, 0, 0, 0, TRANSFER_GET_FIRST_PART, 9];
        assert_eq!(
            h.get_bios_table(&payload),
            vec![CompletionCode::InvalidTableType.byte()]
        );
    }

    #[test]
    fn get_bios_table_builds_lazily_and_serves_sealed_bytes() {
        let h = handler();
        let payload = [0, 0, 0, 0, TRANSFER_GET_FIRST_PART, 1];
        let resp = h.get_bios_table(&payload);
        assert_eq!(resp[0], CompletionCode::Success.byte());
        assert_eq!(resp[5], TRANSFER_START_AND_END);
        let table = &resp[6..];
        assert!(validate(TableKind::Attribute, table).is_ok());
    }

    #[test]
    fn rejects_next_part_transfer_op() {
        let h = handler();
        let payload = [0, 0, 0, 0, message::TRANSFER_GET_NEXT_PART, 1];
        assert_eq!(
            h.get_bios_table(&payload),
            vec![CompletionCode::InvalidTransferOperation.byte()]
        );
    }
}
