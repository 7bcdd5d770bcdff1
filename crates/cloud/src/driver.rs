//! Request orchestration.
//!
//! [`plan`] validates a request and builds one deferred bundle per year
//! without touching the network. [`evaluate`] resolves the bundles in
//! order, one round trip per year, and stops at the first failure so no
//! partial mapping is ever returned.

use std::collections::BTreeMap;

use spectra_core::{IndexBundle, IndexParams, IndexRequest, SpectralIndex};
use tracing::info;

use crate::error::{CloudError, Result};
use crate::graph::Expression;
use crate::indices::{build_index_bundle, DeferredBundle};
use crate::session::ComputeService;

/// Year (as a string key) → index bundle.
///
/// Keys sort as strings, not in request order, so `[999, 2021]` comes out
/// as `"2021"` then `"999"`.
pub type ResultMapping = BTreeMap<String, IndexBundle>;

/// Validate the request and describe every requested year.
///
/// The AOI is checked even when no years are requested.
pub fn plan(request: &IndexRequest, params: &IndexParams) -> Result<Vec<DeferredBundle>> {
    params.validate()?;
    let aoi = request.aoi()?;
    request
        .unique_years()
        .into_iter()
        .map(|year| build_index_bundle(&aoi, year, params))
        .collect()
}

/// Resolve planned bundles sequentially.
pub fn evaluate<S>(service: &S, bundles: &[DeferredBundle]) -> Result<ResultMapping>
where
    S: ComputeService + ?Sized,
{
    let mut results = ResultMapping::new();
    for bundle in bundles {
        let value = service.resolve(&bundle.combined())?;
        let values = decode_bundle(&value)?;
        info!(year = bundle.year, "indices computed");
        results.insert(bundle.year.to_string(), values);
    }
    Ok(results)
}

/// Plan and evaluate in one call.
pub fn compute_indices<S>(
    service: &S,
    request: &IndexRequest,
    params: &IndexParams,
) -> Result<ResultMapping>
where
    S: ComputeService + ?Sized,
{
    let bundles = plan(request, params)?;
    evaluate(service, &bundles)
}

/// Flattened graphs per year, for inspection without evaluation.
pub fn expressions(bundles: &[DeferredBundle]) -> Result<BTreeMap<String, Expression>> {
    bundles
        .iter()
        .map(|b| Ok((b.year.to_string(), Expression::new(b.combined().into_node())?)))
        .collect()
}

/// Decode the evaluated dictionary of one year.
pub fn decode_bundle(value: &serde_json::Value) -> Result<IndexBundle> {
    let obj = value.as_object().ok_or_else(|| {
        CloudError::Decode(format!("expected an object of index means, got {value}"))
    })?;

    let mut bundle = IndexBundle::empty();
    for index in SpectralIndex::ALL {
        let mean = match obj.get(index.name()) {
            Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(other) => {
                return Err(CloudError::Decode(format!(
                    "{} mean is not a number: {}",
                    index, other
                )))
            }
            None => {
                return Err(CloudError::Decode(format!(
                    "response has no value for {}",
                    index
                )))
            }
        };
        bundle.set(index, mean);
    }
    Ok(bundle)
}
