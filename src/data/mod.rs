mod books;

pub use books::{chapter_count, total_chapters, BOOKS, OLD_TESTAMENT_BOOKS};
