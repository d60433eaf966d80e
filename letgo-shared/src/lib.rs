pub mod pii;

pub use pii::{Masked, MaskedPhone};
