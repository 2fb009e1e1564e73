/*!
 * Chunked concurrent translation of transcripts.
 *
 * The pipeline is split into several submodules:
 *
 * - `segmenter`: Paragraph-aware splitting of a transcript into chunks
 * - `client`: One translation call per chunk, with failure classification
 * - `dispatcher`: Bounded-concurrency fan-out with per-chunk retry
 * - `assembler`: Ordered reassembly into a bilingual document
 * - `pipeline`: Segmenter, dispatcher and assembler for one transcript
 * - `batch`: The pipeline applied to a set of files
 * - `prompts`, `formatting`, `retry`, `concurrency`: supporting pieces
 */

// Re-export main types for easier usage
pub use self::assembler::Assembler;
pub use self::batch::{BatchCoordinator, BatchObserver, BatchOptions, NoopObserver};
pub use self::chunk::{Chunk, ChunkResult, ChunkStatus};
pub use self::client::{ChunkTranslator, TranslationClient, TranslationService};
pub use self::dispatcher::{CancellationSignal, DispatchOptions, DispatchOutcome, Dispatcher};
pub use self::document::{Document, ParagraphPair, RenderOptions, Section, SectionOutcome, Transcript};
pub use self::pipeline::{NotesPipeline, PipelineOptions, PipelineOutcome, RunStatus};
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};
pub use self::retry::RetryPolicy;
pub use self::segmenter::Segmenter;

// Submodules
pub mod assembler;
pub mod batch;
pub mod chunk;
pub mod client;
pub mod concurrency;
pub mod dispatcher;
pub mod document;
pub mod formatting;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod segmenter;
