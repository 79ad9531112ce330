use bytes::BufMut;

use crate::{
    sql::{
        Error, Result,
        schema::Schema,
        types::{Value, ValueType},
    },
    storage::{INVALID_PAGE_ID, PageId, hash::key::Storable},
    utils::bytes::{get_bytes, get_i64, get_u8, get_u16, get_u64},
};

/// Record identifier: which page a tuple lives on and which slot within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    pub fn invalid() -> Self {
        Self::new(INVALID_PAGE_ID, 0)
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot)
    }
}

impl Storable for Rid {
    const SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.slot.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let mut page_id = [0u8; 4];
        let mut slot = [0u8; 4];
        page_id.copy_from_slice(&buf[..4]);
        slot.copy_from_slice(&buf[4..8]);
        Self::new(PageId::from_le_bytes(page_id), u32::from_le_bytes(slot))
    }
}

/// Per-tuple bookkeeping stored next to the payload in a table page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleMeta {
    pub ts: u64,
    pub is_deleted: bool,
}

const TAG_BOOL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_TEXT: u8 = 2;

/// One row: a value vector plus the RID it was read from. The byte codec is
/// self-describing, so tuples decode without a schema in hand.
#[derive(Debug, Clone)]
pub struct Tuple {
    rid: Rid,
    values: Vec<Value>,
}

impl Tuple {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            rid: Rid::invalid(),
            values,
        }
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = rid;
    }

    pub fn value(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or(Error::ColumnOutOfRange(index))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    /// Projects the index key columns out of a full table row.
    pub fn key_from_tuple(&self, key_attrs: &[usize]) -> Result<Tuple> {
        let values = key_attrs
            .iter()
            .map(|&i| self.value(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple::from_values(values))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u16_le(self.values.len() as u16);

        for value in &self.values {
            buf.put_u8(type_tag(value.value_type()));
            buf.put_u8(value.is_null() as u8);

            match value {
                Value::Null(_) => {}
                Value::Bool(v) => buf.put_u8(*v as u8),
                Value::Int(v) => buf.put_i64_le(*v),
                Value::Text(v) => {
                    buf.put_u16_le(v.len() as u16);
                    buf.put_slice(v.as_bytes());
                }
            }
        }

        buf
    }

    pub fn decode(mut data: &[u8]) -> Result<Tuple> {
        let count = get_u16(&mut data)?;
        let mut values = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let tag = get_u8(&mut data)?;
            let value_type = value_type_of(tag)?;
            let is_null = get_u8(&mut data)? != 0;

            let value = if is_null {
                Value::null(value_type)
            } else {
                match value_type {
                    ValueType::Bool => Value::Bool(get_u8(&mut data)? != 0),
                    ValueType::Int => Value::Int(get_i64(&mut data)?),
                    ValueType::Text => {
                        let len = get_u16(&mut data)? as usize;
                        let raw = get_bytes(&mut data, len)?;
                        Value::Text(
                            String::from_utf8(raw).map_err(|_| Error::InvalidTupleBytes)?,
                        )
                    }
                }
            };
            values.push(value);
        }

        Ok(Tuple::from_values(values))
    }

    /// Row of typed nulls matching `schema`, the right-side padding of an
    /// unmatched LEFT join row.
    pub fn nulls_for(schema: &Schema) -> Vec<Value> {
        schema
            .columns()
            .iter()
            .map(|col| Value::null(col.value_type()))
            .collect()
    }
}

fn type_tag(value_type: ValueType) -> u8 {
    match value_type {
        ValueType::Bool => TAG_BOOL,
        ValueType::Int => TAG_INT,
        ValueType::Text => TAG_TEXT,
    }
}

fn value_type_of(tag: u8) -> Result<ValueType> {
    match tag {
        TAG_BOOL => Ok(ValueType::Bool),
        TAG_INT => Ok(ValueType::Int),
        TAG_TEXT => Ok(ValueType::Text),
        _ => Err(Error::InvalidTupleBytes),
    }
}

impl TupleMeta {
    pub const SIZE: usize = 9;

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.ts.to_le_bytes());
        buf[8] = self.is_deleted as u8;
    }

    pub fn decode(mut data: &[u8]) -> Result<TupleMeta> {
        let ts = get_u64(&mut data)?;
        let is_deleted = get_u8(&mut data)? != 0;
        Ok(TupleMeta { ts, is_deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema::Column;

    #[test]
    fn test_codec_round_trip() -> anyhow::Result<()> {
        let tuple = Tuple::from_values(vec![
            Value::Int(-42),
            Value::Text("hello".into()),
            Value::Bool(true),
            Value::null(ValueType::Text),
        ]);

        let decoded = Tuple::decode(&tuple.encode())?;
        assert_eq!(decoded.values(), tuple.values());

        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Tuple::decode(&[9]).is_err());
        // count says one value but payload is missing
        assert!(Tuple::decode(&[1, 0, TAG_INT, 0]).is_err());
    }

    #[test]
    fn test_key_from_tuple() -> anyhow::Result<()> {
        let tuple = Tuple::from_values(vec![
            Value::Int(7),
            Value::Text("x".into()),
            Value::Int(99),
        ]);

        let key = tuple.key_from_tuple(&[2])?;
        assert_eq!(key.values(), &[Value::Int(99)]);

        assert!(tuple.key_from_tuple(&[5]).is_err());

        Ok(())
    }

    #[test]
    fn test_nulls_for_schema() {
        let schema = Schema::new(vec![
            Column::new("a", ValueType::Int),
            Column::new("b", ValueType::Text),
        ]);

        let nulls = Tuple::nulls_for(&schema);
        assert_eq!(
            nulls,
            vec![Value::null(ValueType::Int), Value::null(ValueType::Text)]
        );
    }
}
