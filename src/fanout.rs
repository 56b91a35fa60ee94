// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::future::Future;

use tokio::task::JoinSet;

use crate::error::AppError;

/// Spawns every task, waits for all of them and returns their outputs in
/// input order.
///
/// Siblings are never cancelled: when a task fails the remaining ones still
/// run to completion, and the first failure observed is returned afterwards.
pub async fn join_all<I, F, T>(tasks: I) -> Result<Vec<T>, AppError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    for (index, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (index, task.await) });
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(set.len()).collect();
    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(value))) => slots[index] = Some(value),
            Ok((_, Err(err))) => {
                first_error.get_or_insert(err);
            }
            Err(err) => {
                first_error.get_or_insert(AppError::Internal(format!("fetch task failed: {err}")));
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn keeps_input_order() {
        let tasks = (0..5u64).map(|n| async move {
            tokio::time::sleep(Duration::from_millis(10 * (5 - n))).await;
            Ok::<_, AppError>(n)
        });
        assert_eq!(join_all(tasks).await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let tasks: Vec<std::future::Ready<Result<u8, AppError>>> = Vec::new();
        assert!(join_all(tasks).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_waits_for_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let tasks = (0..4usize).map(|n| {
            let finished = finished.clone();
            async move {
                if n == 0 {
                    return Err(AppError::Internal("boom".into()));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
        });
        let err = join_all(tasks).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(message) if message == "boom"));
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }
}
