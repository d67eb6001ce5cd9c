//! Read primer: the staged request consumed by the next performed read.
//!
//! The primer is persisted as `read_primer.tmp`, one line of text:
//!
//! ```text
//! <count> <required_bytes> <name>
//! ```
//!
//! There is a single slot per logging directory. Priming again overwrites
//! it; taking it deletes it.

use crate::error::{CoreError, CoreResult};
use crate::layout::PRIMER_FILE;
use crate::types::VariableName;
use datalog_storage::LogDirectory;
use std::sync::Arc;

/// A staged read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPrimer {
    /// Variable to read.
    pub name: VariableName,
    /// Number of records requested.
    pub count: usize,
    /// Exact buffer length the read must be given.
    pub required_bytes: usize,
}

impl ReadPrimer {
    /// Encodes the primer as its one-line text form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{} {} {}\n", self.count, self.required_bytes, self.name)
    }

    /// Decodes the text form.
    ///
    /// # Errors
    ///
    /// Returns `CorruptPrimer` if a field is missing, extra or unparsable.
    pub fn decode(text: &str, max_name_length: usize) -> CoreResult<Self> {
        let mut fields = text.split_whitespace();
        let (Some(count), Some(bytes), Some(name), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(CoreError::corrupt_primer(format!(
                "expected `count bytes name`, found {:?}",
                text.trim()
            )));
        };

        let count: usize = count
            .parse()
            .map_err(|_| CoreError::corrupt_primer(format!("bad count {count:?}")))?;
        let required_bytes: usize = bytes
            .parse()
            .map_err(|_| CoreError::corrupt_primer(format!("bad byte count {bytes:?}")))?;
        let name = VariableName::parse(name, max_name_length)
            .map_err(|e| CoreError::corrupt_primer(e.to_string()))?;

        Ok(Self {
            name,
            count,
            required_bytes,
        })
    }
}

/// The single primer slot of a logging directory.
#[derive(Clone)]
pub(crate) struct PrimerSlot {
    dir: Arc<dyn LogDirectory>,
    max_name_length: usize,
}

impl PrimerSlot {
    pub(crate) fn new(dir: Arc<dyn LogDirectory>, max_name_length: usize) -> Self {
        Self {
            dir,
            max_name_length,
        }
    }

    /// Persists `primer`, replacing any pending one.
    pub(crate) fn store(&self, primer: &ReadPrimer) -> CoreResult<()> {
        self.dir.write_string(PRIMER_FILE, &primer.encode())?;
        Ok(())
    }

    /// Removes and returns the pending primer.
    ///
    /// The slot is emptied even when its contents turn out to be corrupt.
    pub(crate) fn take(&self) -> CoreResult<Option<ReadPrimer>> {
        let Some(text) = self.dir.read_string(PRIMER_FILE)? else {
            return Ok(None);
        };
        self.dir.remove(PRIMER_FILE)?;
        ReadPrimer::decode(&text, self.max_name_length).map(Some)
    }

    /// Returns the pending primer without consuming it.
    pub(crate) fn peek(&self) -> CoreResult<Option<ReadPrimer>> {
        self.dir
            .read_string(PRIMER_FILE)?
            .map(|text| ReadPrimer::decode(&text, self.max_name_length))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalog_storage::InMemoryDirectory;

    fn primer(name: &str, count: usize, record_size: usize) -> ReadPrimer {
        ReadPrimer {
            name: VariableName::parse(name, 64).unwrap(),
            count,
            required_bytes: count * record_size,
        }
    }

    #[test]
    fn text_form() {
        let p = primer("testmod_testvar", 128, 4);
        assert_eq!(p.encode(), "128 512 testmod_testvar\n");
        assert_eq!(ReadPrimer::decode(&p.encode(), 64).unwrap(), p);
    }

    #[test]
    fn decode_accepts_any_whitespace() {
        let p = ReadPrimer::decode("3\n12\ttemp", 64).unwrap();
        assert_eq!(p, primer("temp", 3, 4));
    }

    #[test]
    fn decode_rejects_garbage() {
        for bad in ["", "3 12", "3 12 temp extra", "x 12 temp", "3 -1 temp", "3 12 a/b"] {
            assert!(
                matches!(ReadPrimer::decode(bad, 64), Err(CoreError::CorruptPrimer { .. })),
                "{bad:?} should be corrupt"
            );
        }
    }

    #[test]
    fn slot_take_consumes() {
        let dir = Arc::new(InMemoryDirectory::new());
        let slot = PrimerSlot::new(dir.clone(), 64);
        assert_eq!(slot.take().unwrap(), None);

        slot.store(&primer("temp", 2, 4)).unwrap();
        slot.store(&primer("temp", 5, 4)).unwrap();
        assert_eq!(slot.peek().unwrap(), Some(primer("temp", 5, 4)));
        assert_eq!(slot.take().unwrap(), Some(primer("temp", 5, 4)));
        assert_eq!(slot.take().unwrap(), None);
        assert!(dir.is_empty());
    }

    #[test]
    fn corrupt_slot_is_still_consumed() {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.put_raw(PRIMER_FILE, b"nonsense".to_vec());
        let slot = PrimerSlot::new(dir.clone(), 64);

        assert!(matches!(slot.take(), Err(CoreError::CorruptPrimer { .. })));
        assert_eq!(slot.take().unwrap(), None);
    }
}
