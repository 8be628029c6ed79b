pub mod driver;
pub mod pool;
pub mod scripts;
pub mod traits;
pub mod types;

pub use driver::ChromeRenderer;
pub use pool::{BrowserPool, PoolConfig};
pub use traits::ListingRenderer;
pub use types::{RawCapture, RenderOptions};
