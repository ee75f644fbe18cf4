pub mod apply;
pub mod binary;
pub mod html;
pub mod urlcode;

pub use apply::{ApplyOutcome, NameValueApplier};
pub use binary::{BinaryReader, BinaryWriter, ReadMode};
pub use html::{escape_html, FormRenderer};
pub use urlcode::percent_decode;
