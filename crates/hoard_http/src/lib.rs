pub mod responses;

pub use responses::HttpResponse;
