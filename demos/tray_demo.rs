use anyhow::Result;
use minitray::{MenuItem, PumpOutcome, Tray, TrayHost, TrayIcon};
use std::cell::Cell;
use std::rc::Rc;

fn main() -> Result<()> {
    env_logger::init();

    let quit = Rc::new(Cell::new(false));
    let opens = Rc::new(Cell::new(0u32));

    let tray = Tray::new(TrayIcon::path("demos/demo.ico"))
        .tooltip("minitray demo")
        .item(MenuItem::new("Open").on_select({
            let opens = opens.clone();
            move |_| {
                opens.set(opens.get() + 1);
                println!("open selected ({} so far)", opens.get());
            }
        }))
        .item(MenuItem::new("Muted").checkbox(false).on_select(|item| {
            println!("muted toggled (was {})", item.checked);
        }))
        .item(MenuItem::separator())
        .item(MenuItem::new("Quit").on_select({
            let quit = quit.clone();
            move |_| quit.set(true)
        }));

    let mut host = TrayHost::init(tray)?;
    host.set_hotkey_handler(|spec| println!("hotkey fired: {spec}"));
    host.register_hotkey("ctrl+shift+m")?;

    while !quit.get() {
        if host.pump(true) == PumpOutcome::Quit {
            break;
        }
    }

    host.unregister_hotkey("ctrl+shift+m");
    host.exit();
    Ok(())
}
