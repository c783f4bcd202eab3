pub mod button_watcher;
