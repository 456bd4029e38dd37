//! End-to-end pipeline scenarios against recording collaborators.

mod pipeline_flow;
mod support;
