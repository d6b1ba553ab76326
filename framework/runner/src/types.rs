/// Recommended error type for your scenario `main` function and any shared code that you write
/// for hooks, so that `?` can be used to propagate errors.
pub type LogBenchResult<T> = anyhow::Result<T>;
