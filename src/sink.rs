use super::error::Result;
use super::store::{Record, Store};

/// Buffers rows for one table and writes them through [`Store::upsert`] in batches.
///
/// Rows pushed together are flushed together, so a filing's holdings never straddle two
/// transactions. A batch can therefore exceed `batch_size` by up to one filing.
#[derive(Debug)]
pub struct BatchSink<R> {
    table: String,
    key: String,
    batch_size: usize,
    buffer: Vec<R>,
    written: usize,
}

impl<R: Record> BatchSink<R> {
    pub fn new(table: impl Into<String>, key: impl Into<String>, batch_size: usize) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            written: 0,
        }
    }

    pub fn push(&mut self, store: &mut Store, row: R) -> Result<usize> {
        self.push_all(store, vec![row])
    }

    /// Buffers `rows` and flushes once the buffer reaches the batch size. Returns the number
    /// of rows written by this call.
    pub fn push_all(&mut self, store: &mut Store, rows: Vec<R>) -> Result<usize> {
        self.buffer.extend(rows);
        if self.buffer.len() >= self.batch_size {
            self.flush(store)
        } else {
            Ok(0)
        }
    }

    pub fn flush(&mut self, store: &mut Store) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let written = store.upsert(&self.table, &self.buffer, &self.key)?;
        tracing::debug!(
            table = %self.table,
            buffered = self.buffer.len(),
            written,
            "batch flushed"
        );
        self.buffer.clear();
        self.written += written;
        Ok(written)
    }

    /// Flushes what is left and returns the total number of rows written by this sink.
    pub fn finish(mut self, store: &mut Store) -> Result<usize> {
        self.flush(store)?;
        Ok(self.written)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    struct Row(u32);

    impl Record for Row {
        const COLUMNS: &'static [&'static str] = &["id"];

        fn values(&self) -> Vec<Value> {
            vec![Value::Integer(self.0 as i64)]
        }
    }

    #[test]
    fn test_flushes_at_batch_size() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sink = BatchSink::new("rows", "id", 3);

        assert_eq!(sink.push_all(&mut store, vec![Row(1), Row(2)]).unwrap(), 0);
        assert_eq!(store.count("rows").unwrap(), 0);
        assert_eq!(sink.pending(), 2);

        // A filing is never split: all four rows land in one flush.
        assert_eq!(
            sink.push_all(&mut store, vec![Row(3), Row(4), Row(5), Row(6)]).unwrap(),
            6
        );
        assert_eq!(sink.pending(), 0);

        sink.push(&mut store, Row(7)).unwrap();
        assert_eq!(sink.finish(&mut store).unwrap(), 7);
        assert_eq!(store.count("rows").unwrap(), 7);
    }

    #[test]
    fn test_finish_skips_known_keys() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert("rows", &[Row(1)], "id").unwrap();

        let mut sink = BatchSink::new("rows", "id", 100);
        sink.push_all(&mut store, vec![Row(1), Row(2)]).unwrap();
        assert_eq!(sink.finish(&mut store).unwrap(), 1);
    }
}
