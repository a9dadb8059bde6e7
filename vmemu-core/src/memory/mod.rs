//! VMM: virtual memory manager over a fixed-size emulated physical image.

pub mod frame_table;
pub mod image;
pub mod page_table;
pub mod swap;
pub mod thread_handle;
pub mod vmm;

pub use page_table::virtual_address_to_vpn;
pub use thread_handle::ThreadHandle;
pub use vmm::Vmm;
