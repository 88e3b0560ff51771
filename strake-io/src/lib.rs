#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Segment I/O: the writer, the two [`input::SegmentInput`] backends, the
//! row reader built on top of them, the scoped region allocator, and the
//! streaming select engine.

pub mod input;
pub mod parallel;
pub mod region;
pub mod row_reader;
pub mod select;
pub mod writer;

pub use input::{MappedInput, SegmentInput, StreamedInput};
pub use parallel::{Executor, RayonExecutor, SequentialExecutor};
pub use region::{Region, RegionPool};
pub use row_reader::{ReadError, RowReader};
pub use select::{execute, Predicate, SelectError};
pub use writer::{SegmentSink, SegmentWriter, WriteError, WriterMetrics, WriterOptions, WriteSink};

pub use strake_codec::{Codec, FieldDecoder, FieldEncoder};
pub use strake_format::{CodecTag, ColumnDescriptor, FormatError, Limits, SegmentHeader};
