// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bitvec::prelude::*;
use chrono;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use vcd;

use crate::ports::{Inputs, Outputs};
use crate::Error;

const DEFAULT_VCD_HEADER: &str = "ranking table harness VCD";
pub const DEFAULT_TOP_MODULE: &str = "tb";

/// Pins traced in the waveform, with their widths in bits.
const SIGNALS: [(&str, u32); 20] = [
    ("clk", 1),
    ("rst", 1),
    ("upd_vld", 1),
    ("upd_ctx", 8),
    ("upd_op", 8),
    ("upd_key", 64),
    ("upd_volume", 32),
    ("qry_vld", 1),
    ("qry_ctx", 8),
    ("qry_level", 8),
    ("busy", 1),
    ("qr_vld", 1),
    ("qr_key", 64),
    ("qr_volume", 32),
    ("qr_error", 1),
    ("qr_listsize", 8),
    ("ntf_vld", 1),
    ("ntf_ctx", 8),
    ("ntf_key", 64),
    ("ntf_volume", 32),
];

fn signal_values(inputs: &Inputs, outputs: &Outputs) -> [u64; 20] {
    [
        inputs.clk as u64,
        inputs.rst as u64,
        inputs.upd_vld as u64,
        inputs.upd_ctx as u64,
        inputs.upd_op as u64,
        inputs.upd_key as u64,
        inputs.upd_volume as u64,
        inputs.qry_vld as u64,
        inputs.qry_ctx as u64,
        inputs.qry_level as u64,
        outputs.busy as u64,
        outputs.qr_vld as u64,
        outputs.qr_key as u64,
        outputs.qr_volume as u64,
        outputs.qr_error as u64,
        outputs.qr_listsize as u64,
        outputs.ntf_vld as u64,
        outputs.ntf_ctx as u64,
        outputs.ntf_key as u64,
        outputs.ntf_volume as u64,
    ]
}

/// Buffered file shared by the `vcd::Writer` and `VcdWriter::close`, so the
/// final flush can report its error.
#[derive(Clone)]
struct SharedFile(Rc<RefCell<io::BufWriter<fs::File>>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

/// Writes the pin activity of the unit under test to a VCD file, one
/// timestamp per kernel tick. Only changed values are recorded.
pub struct VcdWriter {
    writer: vcd::Writer<SharedFile>,
    file: SharedFile,
    is_error_state: bool,
    id_codes: Vec<vcd::IdCode>,
    last_values: Vec<Option<u64>>,
}

impl VcdWriter {
    pub fn create(path: &Path) -> Result<Self, Error> {
        let file = fs::File::create(path)
            .map_err(|e| Error::Waveform(format!("cannot create {}: {}", path.display(), e)))?;
        let file = SharedFile(Rc::new(RefCell::new(io::BufWriter::new(file))));
        let mut writer = Self {
            writer: vcd::Writer::new(file.clone()),
            file,
            is_error_state: false,
            id_codes: Vec::with_capacity(SIGNALS.len()),
            last_values: vec![None; SIGNALS.len()],
        };
        writer
            .write_header()
            .map_err(|e| Error::Waveform(format!("cannot write {}: {}", path.display(), e)))?;
        log::info!("VCD tracing to {}", path.display());
        Ok(writer)
    }

    fn vcd_error_handler(&mut self, err: io::Error) {
        if !self.is_error_state {
            self.is_error_state = true;
            log::error!("VCD writing failed with error {:?}", err)
        }
    }

    pub fn is_error_state(&self) -> bool {
        self.is_error_state
    }

    /// Flushes everything written so far; a failure puts the writer in the
    /// error state.
    pub fn close(&mut self) {
        if self.is_error_state {
            return;
        }
        if let Err(err) = self.file.flush() {
            self.vcd_error_handler(err);
        }
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.writer.comment(DEFAULT_VCD_HEADER)?;
        self.writer.date(chrono::Utc::now().to_string().as_str())?;
        self.writer.timescale(1, vcd::TimescaleUnit::NS)?;
        self.writer.add_module(DEFAULT_TOP_MODULE)?;
        for (reference, width) in SIGNALS.iter() {
            let id_code = self.writer.add_wire(*width, reference)?;
            self.id_codes.push(id_code);
        }
        self.writer.upscope()?;
        self.writer.enddefinitions()
    }

    /// Records the pin state at `timestamp`.
    pub fn dump(&mut self, timestamp: u64, inputs: &Inputs, outputs: &Outputs) {
        if self.is_error_state {
            return;
        }
        self._dump(timestamp, inputs, outputs)
            .unwrap_or_else(|err| self.vcd_error_handler(err));
    }

    fn _dump(&mut self, timestamp: u64, inputs: &Inputs, outputs: &Outputs) -> io::Result<()> {
        let values = signal_values(inputs, outputs);
        let mut stamped = false;
        for (index, value) in values.iter().enumerate() {
            if self.last_values[index] == Some(*value) {
                continue;
            }
            if !stamped {
                self.writer.timestamp(timestamp)?;
                stamped = true;
            }
            let id_code = self.id_codes[index];
            let width = SIGNALS[index].1 as usize;
            if width == 1 {
                self.writer.change_scalar(id_code, *value != 0)?;
            } else {
                self.writer.change_vector(
                    id_code,
                    value.view_bits::<Lsb0>()[..width]
                        .iter()
                        .rev()
                        .map(|b| (*b).into())
                        .collect::<Vec<_>>()
                        .as_slice(),
                )?;
            }
            self.last_values[index] = Some(*value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_only_changes() {
        let path = std::env::temp_dir().join("harness_vcd_dump_only_changes.vcd");
        {
            let mut writer = VcdWriter::create(&path).expect("create VCD");
            let mut inputs = Inputs::default();
            let outputs = Outputs::default();
            writer.dump(0, &inputs, &outputs);
            writer.dump(1, &inputs, &outputs);
            inputs.clk = true;
            inputs.upd_key = -1;
            writer.dump(2, &inputs, &outputs);
            assert!(!writer.is_error_state());
        }
        let contents = fs::read_to_string(&path).expect("read VCD");
        assert!(contents.contains("$enddefinitions"));
        assert!(contents.contains("#0"));
        assert!(!contents.contains("#1\n"));
        assert!(contents.contains("#2"));
        assert!(contents.contains(&format!("b{}", "1".repeat(64))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn close_flushes_without_drop() {
        let path = std::env::temp_dir().join("harness_vcd_close_flushes.vcd");
        let mut writer = VcdWriter::create(&path).expect("create VCD");
        writer.dump(0, &Inputs::default(), &Outputs::default());
        writer.close();
        assert!(!writer.is_error_state());
        let contents = fs::read_to_string(&path).expect("read VCD");
        assert!(contents.contains("$enddefinitions"));
        assert!(contents.contains("#0"));
        drop(writer);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_close_is_an_error_state() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        // The header fits in the buffer; only the flush hits the device.
        let mut writer = VcdWriter::create(full).expect("create VCD");
        assert!(!writer.is_error_state());
        writer.close();
        assert!(writer.is_error_state());
    }
}
