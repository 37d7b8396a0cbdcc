// Resume parsing: prompt building, response repair, normalization and the
// pipeline that ties them to text extraction and the model gateway.
// All model calls go through llm_client; no direct HTTP calls here.

pub mod handlers;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod repair;
