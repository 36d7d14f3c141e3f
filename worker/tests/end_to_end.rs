use common::{
    bucket_for, AssignmentRequest, CompletionNotice, JobStatusReport, KeyValue, TaskKind,
};
use coordinator::{Coordinator, CoordinatorConfig};
use std::{fs, path::Path, sync::Arc, time::Duration};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};
use worker::{run_worker, CoordinatorClient, MapFn, ReduceFn, WorkerConfig};

fn split_words(_filename: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split_whitespace()
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

fn sum_counts(_key: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.parse::<u64>().unwrap_or(0))
        .sum::<u64>()
        .to_string()
}

fn word_count() -> (MapFn, ReduceFn) {
    (Arc::new(split_words), Arc::new(sum_counts))
}

// Reduce que tarda `delay` por clave, para simular un worker lento
fn slow_word_count(delay: Duration) -> (MapFn, ReduceFn) {
    let reduce = move |key: &str, values: &[String]| -> String {
        std::thread::sleep(delay);
        sum_counts(key, values)
    };
    (Arc::new(split_words), Arc::new(reduce))
}

fn coordinator_config(tick: Duration, timeout_ticks: u32) -> CoordinatorConfig {
    CoordinatorConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        tick,
        timeout_ticks,
    }
}

fn worker_config(coordinator: &Coordinator, dir: &Path) -> WorkerConfig {
    WorkerConfig {
        coordinator_url: format!("http://{}", coordinator.local_addr()),
        work_dir: dir.to_path_buf(),
        idle_backoff: Duration::from_millis(50),
        poll_interval: Duration::from_millis(10),
    }
}

fn write_inputs(dir: &Path) -> Vec<String> {
    fs::write(dir.join("in-0.txt"), "the quick fox").unwrap();
    fs::write(dir.join("in-1.txt"), "the lazy fox").unwrap();
    vec!["in-0.txt".to_string(), "in-1.txt".to_string()]
}

fn worker_request(id: &str) -> AssignmentRequest {
    AssignmentRequest {
        worker_id: id.to_string(),
        hostname: "test".to_string(),
    }
}

// Espera hasta que el estado del coordinator cumpla `cond`
async fn wait_for_status(coordinator: &Coordinator, cond: impl Fn(&JobStatusReport) -> bool) {
    timeout(Duration::from_secs(10), async {
        while !cond(&coordinator.status()) {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("el coordinator no llegó al estado esperado");
}

// Deja un intermedio ya escrito y da por completo el map 0 desde otro cliente
async fn complete_map_zero(coordinator: &Coordinator, dir: &Path) -> CoordinatorClient {
    fs::write(dir.join("mr-0-0"), "{\"key\":\"fox\",\"value\":\"1\"}\n").unwrap();

    let client = CoordinatorClient::new(format!("http://{}", coordinator.local_addr())).unwrap();
    let map = client.request_assignment(&worker_request("mapper")).await.unwrap();
    assert_eq!(map.kind, TaskKind::Map);
    let accepted = client
        .report_completion(&CompletionNotice {
            worker_id: "mapper".to_string(),
            kind: TaskKind::Map,
            id: map.id,
            produced_files: vec!["mr-0-0".to_string()],
        })
        .await
        .unwrap();
    assert!(accepted);
    client
}

async fn wait_for_completion(coordinator: &Coordinator) {
    timeout(Duration::from_secs(20), async {
        while !coordinator.is_job_complete() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("el job no terminó a tiempo");
}

// Lee las salidas, verifica que cada clave esté en su bucket y devuelve las líneas ordenadas
fn collect_output(dir: &Path, n_reduce: usize) -> Vec<String> {
    let mut all = Vec::new();
    for bucket in 0..n_reduce {
        let content = fs::read_to_string(dir.join(format!("mr-out-{}", bucket))).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted, "mr-out-{} no está ordenado", bucket);

        for line in lines {
            let key = line.split(' ').next().unwrap();
            assert_eq!(bucket_for(key, n_reduce), bucket, "{} en bucket equivocado", key);
            all.push(line.to_string());
        }
    }
    all.sort();
    all
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_con_dos_workers() {
    let tmp = TempDir::new().unwrap();
    let files = write_inputs(tmp.path());

    let config = coordinator_config(Duration::from_millis(100), 10);
    let coordinator = Coordinator::start(files, 2, config).await.unwrap();

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let (map_fn, reduce_fn) = word_count();
            tokio::spawn(run_worker(
                worker_config(&coordinator, tmp.path()),
                map_fn,
                reduce_fn,
            ))
        })
        .collect();

    wait_for_completion(&coordinator).await;
    coordinator.shutdown().await;

    // sin coordinator, los workers terminan solos
    for w in workers {
        timeout(Duration::from_secs(10), w)
            .await
            .expect("el worker no terminó")
            .unwrap()
            .unwrap();
    }

    assert_eq!(
        collect_output(tmp.path(), 2),
        vec!["fox 2", "lazy 1", "quick 1", "the 2"]
    );

    // los reduce aceptados borraron los intermedios
    for map_id in 0..2 {
        for bucket in 0..2 {
            assert!(!tmp.path().join(format!("mr-{}-{}", map_id, bucket)).exists());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tarea_colgada_se_reasigna_y_el_job_termina() {
    let tmp = TempDir::new().unwrap();
    let files = write_inputs(tmp.path());

    let config = coordinator_config(Duration::from_millis(20), 5);
    let coordinator = Coordinator::start(files, 2, config).await.unwrap();

    // un worker que toma el primer map y nunca reporta
    let client = CoordinatorClient::new(format!("http://{}", coordinator.local_addr())).unwrap();
    let stalled = client.request_assignment(&worker_request("caido")).await.unwrap();
    assert_eq!(stalled.kind, TaskKind::Map);
    assert_eq!(stalled.id, 0);

    let (map_fn, reduce_fn) = word_count();
    let survivor = tokio::spawn(run_worker(
        worker_config(&coordinator, tmp.path()),
        map_fn,
        reduce_fn,
    ));

    wait_for_completion(&coordinator).await;

    // el aviso tardío del worker caído ya no vale
    let late = client
        .report_completion(&CompletionNotice {
            worker_id: "caido".to_string(),
            kind: TaskKind::Map,
            id: stalled.id,
            produced_files: vec!["mr-0-0".to_string(), "mr-0-1".to_string()],
        })
        .await
        .unwrap();
    assert!(!late);

    coordinator.shutdown().await;
    timeout(Duration::from_secs(10), survivor)
        .await
        .expect("el worker no terminó")
        .unwrap()
        .unwrap();

    assert_eq!(
        collect_output(tmp.path(), 2),
        vec!["fox 2", "lazy 1", "quick 1", "the 2"]
    );
}

#[tokio::test]
async fn worker_termina_si_no_hay_coordinator() {
    let tmp = TempDir::new().unwrap();

    // puerto que nadie escucha: bind y soltar
    let addr = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap()
    };
    let config = WorkerConfig {
        coordinator_url: format!("http://{}", addr),
        work_dir: tmp.path().to_path_buf(),
        idle_backoff: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
    };

    let (map_fn, reduce_fn) = word_count();
    timeout(Duration::from_secs(5), run_worker(config, map_fn, reduce_fn))
        .await
        .expect("el worker no terminó")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reduce_rechazado_no_borra_sus_intermedios() {
    let tmp = TempDir::new().unwrap();
    let config = coordinator_config(Duration::from_millis(20), 5);
    let coordinator = Coordinator::start(vec!["in-0.txt".to_string()], 1, config)
        .await
        .unwrap();
    let client = complete_map_zero(&coordinator, tmp.path()).await;

    // el worker toma el reduce 0 y tarda mucho más que el timeout
    let (map_fn, reduce_fn) = slow_word_count(Duration::from_millis(800));
    let slow = tokio::spawn(run_worker(
        worker_config(&coordinator, tmp.path()),
        map_fn,
        reduce_fn,
    ));
    wait_for_status(&coordinator, |s| s.in_progress_reduce == 1).await;

    // el reduce vuelve a pendientes y otro cliente lo completa primero
    let reduce = timeout(Duration::from_secs(5), async {
        loop {
            let t = client.request_assignment(&worker_request("rapido")).await.unwrap();
            if t.kind == TaskKind::Reduce {
                return t;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("el reduce no volvió a pendientes");
    assert_eq!(reduce.id, 0);
    assert_eq!(reduce.files, vec!["mr-0-0".to_string()]);

    let accepted = client
        .report_completion(&CompletionNotice {
            worker_id: "rapido".to_string(),
            kind: TaskKind::Reduce,
            id: reduce.id,
            produced_files: Vec::new(),
        })
        .await
        .unwrap();
    assert!(accepted);
    assert!(coordinator.is_job_complete());

    // el worker lento deja su salida y su aviso llega tarde
    timeout(Duration::from_secs(5), async {
        while !tmp.path().join("mr-out-0").exists() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("el worker lento no escribió su salida");
    sleep(Duration::from_millis(300)).await;

    coordinator.shutdown().await;
    timeout(Duration::from_secs(10), slow)
        .await
        .expect("el worker no terminó")
        .unwrap()
        .unwrap();

    assert!(tmp.path().join("mr-0-0").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn error_local_termina_el_worker_y_la_tarea_queda_en_vuelo() {
    let tmp = TempDir::new().unwrap();
    let config = coordinator_config(Duration::from_millis(50), 200);
    let coordinator = Coordinator::start(vec!["no-existe.txt".to_string()], 1, config)
        .await
        .unwrap();

    let (map_fn, reduce_fn) = word_count();
    let res = timeout(
        Duration::from_secs(5),
        run_worker(worker_config(&coordinator, tmp.path()), map_fn, reduce_fn),
    )
    .await
    .expect("el worker no terminó");
    assert!(res.is_err());

    // nadie avisó: la tarea sigue asignada hasta que venza
    let status = coordinator.status();
    assert_eq!(status.in_progress_map, 1);
    assert_eq!(status.pending_map, 0);
    assert!(!tmp.path().join("mr-0-0").exists());

    coordinator.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reporte_fallido_cuenta_como_rechazo() {
    let tmp = TempDir::new().unwrap();
    let config = coordinator_config(Duration::from_millis(50), 200);
    let coordinator = Coordinator::start(vec!["in-0.txt".to_string()], 1, config)
        .await
        .unwrap();
    complete_map_zero(&coordinator, tmp.path()).await;

    let (map_fn, reduce_fn) = slow_word_count(Duration::from_millis(500));
    let slow = tokio::spawn(run_worker(
        worker_config(&coordinator, tmp.path()),
        map_fn,
        reduce_fn,
    ));
    wait_for_status(&coordinator, |s| s.in_progress_reduce == 1).await;

    // el coordinator se va mientras el reduce sigue corriendo
    coordinator.shutdown().await;

    timeout(Duration::from_secs(10), slow)
        .await
        .expect("el worker no terminó")
        .unwrap()
        .unwrap();

    assert!(tmp.path().join("mr-out-0").exists());
    assert!(tmp.path().join("mr-0-0").exists());
}
