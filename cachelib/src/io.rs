use std::fs::File;
use std::io::BufRead;

use crate::error::SimError;

/// Byte source for a trace file. `BufRead` covers both the fixed-record
/// binary formats and line-oriented text traces.
pub type TraceInput = Box<dyn BufRead + Send>;

/// Opens the byte source for a trace file. Reads are sequential-only.
pub fn open_input(file: File, record_size: usize) -> Result<TraceInput, SimError> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        // Keep reads aligned with whole records, 4096 is the standard block size (or a multiple of it) on most systems
        Ok(Box::new(BufReader::with_capacity(record_size * 4096, file)))
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use std::io::Cursor;

        use memmap2::{Advice, Mmap};
        let _ = record_size;
        unsafe {
            let m = Mmap::map(&file)?;
            m.advise(Advice::Sequential)?;
            Ok(Box::new(Cursor::new(m)))
        }
    }
}
