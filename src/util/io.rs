use crate::error::GCError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

pub fn get_buf_reader(file_path: &str) -> Result<BufReader<File>, GCError> {
    Ok(BufReader::new(
        File::open(file_path).map_err(|e| GCError::ReadFile(file_path.to_owned(), e.to_string()))?,
    ))
}

pub struct GcWriter {
    buf_writer: BufWriter<File>,
    file_path: String,
}

impl GcWriter {
    pub fn new(file_path: String) -> Result<Self, GCError> {
        let buf_writer = BufWriter::new(
            File::create(&file_path)
                .map_err(|e| GCError::CreateFile(file_path.clone(), e.to_string()))?,
        );
        Ok(Self { buf_writer, file_path })
    }

    #[inline]
    pub fn write_file_lines(
        &mut self,
        lines: impl Iterator<Item = String>,
    ) -> Result<(), GCError> {
        for line in lines {
            self.write_file_line(&line)?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_file_line(&mut self, line: &str) -> Result<(), GCError> {
        self.buf_writer
            .write_all([line, "\n"].concat().as_bytes())
            .map_err(|e| GCError::WriteFile(self.file_path.clone(), e.to_string()))
    }

    pub fn flush(mut self) -> Result<(), GCError> {
        self.buf_writer.flush().map_err(|e| GCError::WriteFile(self.file_path, e.to_string()))
    }
}
