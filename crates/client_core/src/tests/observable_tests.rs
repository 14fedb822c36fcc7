use super::*;

fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value: &T| sink.lock().expect("seen").push(value.clone()))
}

#[test]
fn subscribe_delivers_current_value_then_each_mutation() {
    let cell = Observable::new(1);
    let (seen, observer) = recorder::<i32>();
    let _sub = cell.subscribe(observer);

    cell.set(2);
    cell.update(|value| *value += 10);

    assert_eq!(*seen.lock().expect("seen"), vec![1, 2, 12]);
    assert_eq!(cell.get(), 12);
}

#[test]
fn observers_are_notified_in_registration_order() {
    let cell = Observable::new(0);
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = cell.subscribe({
        let order = Arc::clone(&order);
        move |_: &i32| order.lock().expect("order").push("first")
    });
    let second = cell.subscribe({
        let order = Arc::clone(&order);
        move |_: &i32| order.lock().expect("order").push("second")
    });
    order.lock().expect("order").clear();

    cell.set(5);

    assert_eq!(*order.lock().expect("order"), vec!["first", "second"]);
    drop((first, second));
}

#[test]
fn dropping_subscription_detaches_observer() {
    let cell = Observable::new(String::from("a"));
    let (seen, observer) = recorder::<String>();
    let sub = cell.subscribe(observer);
    assert_eq!(cell.observer_count(), 1);

    drop(sub);
    cell.set("b".to_string());

    assert_eq!(cell.observer_count(), 0);
    assert_eq!(*seen.lock().expect("seen"), vec!["a".to_string()]);
}

#[test]
fn explicit_detach_matches_drop() {
    let cell = Observable::new(0u8);
    let (seen, observer) = recorder::<u8>();
    let sub = cell.subscribe(observer);

    sub.detach();
    cell.set(9);

    assert_eq!(*seen.lock().expect("seen"), vec![0]);
}

#[test]
fn clones_share_the_same_cell() {
    let cell = Observable::new(Vec::<u32>::new());
    let other = cell.clone();
    let (seen, observer) = recorder::<Vec<u32>>();
    let _sub = other.subscribe(observer);

    cell.update(|values| values.push(3));

    assert_eq!(other.get(), vec![3]);
    assert_eq!(seen.lock().expect("seen").last(), Some(&vec![3]));
}

#[test]
fn try_update_notifies_only_on_replacement() {
    let cell = Observable::new(1);
    let (seen, observer) = recorder::<i32>();
    let _sub = cell.subscribe(observer);

    assert!(!cell.try_update(|value| (*value > 5).then_some(0)));
    assert!(cell.try_update(|value| (*value == 1).then_some(7)));

    assert_eq!(*seen.lock().expect("seen"), vec![1, 7]);
}

#[test]
fn observer_may_read_the_cell_while_notified() {
    let cell = Observable::new(1);
    let reader = cell.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = cell.subscribe({
        let seen = Arc::clone(&seen);
        move |_: &i32| seen.lock().expect("seen").push(reader.get())
    });

    cell.set(4);

    assert_eq!(*seen.lock().expect("seen"), vec![1, 4]);
}

#[test]
fn subscription_outliving_cell_detaches_quietly() {
    let cell = Observable::new(0);
    let (_seen, observer) = recorder::<i32>();
    let sub = cell.subscribe(observer);

    drop(cell);
    drop(sub);
}

#[test]
fn concurrent_mutations_are_observed_in_commit_order() {
    let cell = Observable::new(0u32);
    let (seen, observer) = recorder::<u32>();
    let _sub = cell.subscribe(observer);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let cell = cell.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    cell.update(|value| *value += 1);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer");
    }

    let seen = seen.lock().expect("seen");
    assert_eq!(seen.len(), 1001);
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(seen.last().copied(), Some(cell.get()));
}
