//! The library code for the `xylem` static site generator. A build is one
//! synchronous pass over a directory of `.xyl` posts:
//!
//! 1. Resetting the output directory ([`crate::build`])
//! 2. Building each post ([`crate::post`]): extracting the `xyl-meta`
//!    directives that carry its title, date, and layout
//!    ([`crate::metadata`]), then interpreting it against its layout
//!    ([`crate::xyl`]) and writing the result to disk
//! 3. Rendering the index page, which lists every post in build order
//!
//! Posts are built in descending order of their source path, so date-prefixed
//! file names (`2024-02-01.xyl`, `2024-01-01.xyl`, ...) come out newest first.
//!
//! Layouts and overlays are `gtmpl` templates. Every template sees the
//! [`crate::router::Router`] as `routes`, alongside its own data: a post sees
//! `title`, `date`, `timestamp`, and `meta`; the index sees `posts`.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod metadata;
pub mod post;
pub mod router;
pub mod util;
pub mod value;
pub mod xyl;
