#![warn(missing_docs)]
//! # qrid binary
//!
//! Shows the device identifier as a QR code for a fixed time, then cleans up.

use qrid_app::logging::{initialize_logger, log_error, log_info};
use qrid_app::{AppError, Presenter, QridConfig, SessionController, SessionOutcome, app_version};
use qrid_identity::default_source;

/// CLI entry point.
fn main() {
    let config = QridConfig::from_env();

    if let Err(error) = initialize_logger(&config.log_path()) {
        eprintln!("failed to start qrid: {error}");
        std::process::exit(1);
    }
    log_info(
        "bootstrap",
        "startup",
        &format!(
            "version={} work_dir={}",
            app_version(),
            config.work_dir.display()
        ),
    );

    #[cfg(windows)]
    let presenter = win32_ui::Win32Presenter::new();
    #[cfg(not(windows))]
    let presenter = qrid_app::ConsolePresenter::new(std::io::stdout());

    match run(config, presenter) {
        Ok(outcome) => log_info(
            "bootstrap",
            "exit",
            &format!(
                "cause={} stale_artifact_removed={}",
                outcome.cause, outcome.stale_artifact_removed
            ),
        ),
        Err(error) => {
            log_error("bootstrap", "fatal", &error.to_string());
            eprintln!("qrid failed: {error}");
            std::process::exit(1);
        }
    }
}

fn run<P: Presenter>(config: QridConfig, presenter: P) -> Result<SessionOutcome, AppError> {
    let source = default_source(&config.identity);
    let mut controller = SessionController::new(config, source, presenter);
    controller.install_interrupt_handler()?;
    controller.run()
}

#[cfg(windows)]
mod win32_ui {
    //! Frameless, always-on-top Win32 window showing the QR code above a
    //! countdown label.

    use std::cell::RefCell;
    use std::ffi::c_void;
    use std::path::Path;
    use std::ptr::{null, null_mut};
    use std::sync::mpsc::{self, Receiver};

    use qrid_app::logging::{log_error, log_info};
    use qrid_app::{AppError, CountdownWorker, PresentRequest, Presenter, spawn_countdown_worker};
    use qrid_ui::{DisplaySession, Rect, SessionAction, SessionEvent, TerminationCause};
    use windows_sys::Win32::Foundation::{
        ERROR_CLASS_ALREADY_EXISTS, GetLastError, HWND, LPARAM, LRESULT, WPARAM,
    };
    use windows_sys::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BeginPaint, COLOR_WINDOW, DIB_RGB_COLORS, EndPaint,
        InvalidateRect, PAINTSTRUCT, SRCCOPY, StretchDIBits,
    };
    use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::VK_ESCAPE;
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
        GetMessageW, GetSystemMetrics, IDC_ARROW, LoadCursorW, MSG, PostMessageW, PostQuitMessage,
        RegisterClassW, SM_CXSCREEN, SM_CYSCREEN, SW_SHOW, SetForegroundWindow,
        SetWindowTextW, ShowWindow, TranslateMessage, WM_APP, WM_CLOSE, WM_DESTROY, WM_KEYDOWN,
        WM_PAINT, WNDCLASSW, WS_CHILD, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, WS_VISIBLE,
    };

    const WINDOW_CLASS_NAME: &str = "QridCodeWindowClass";
    const WINDOW_TITLE: &str = "QR Code Viewer";
    const WM_SESSION_EVENT: u32 = WM_APP + 1;
    // Static control style: centered text.
    const SS_CENTER: u32 = 0x0000_0001;

    std::thread_local! {
        static WINDOW_STATE: RefCell<Option<WindowState>> = const { RefCell::new(None) };
    }

    /// BGR24 top-down bitmap, already scaled to its on-screen rectangle.
    struct CodeBitmap {
        width: i32,
        height: i32,
        bgr24: Vec<u8>,
    }

    struct WindowState {
        session: DisplaySession,
        label: HWND,
        bitmap: CodeBitmap,
        image_rect: Rect,
        event_rx: Receiver<SessionEvent>,
        worker: Option<CountdownWorker>,
    }

    /// Native presenter; must run on the thread that owns the message loop.
    #[derive(Debug, Default)]
    pub struct Win32Presenter;

    impl Win32Presenter {
        pub fn new() -> Self {
            Self
        }
    }

    impl Presenter for Win32Presenter {
        fn present(&mut self, request: PresentRequest<'_>) -> Result<TerminationCause, AppError> {
            let layout = request.layout;
            let (image_width, image_height, luma) = load_artifact(request.artifact_path)?;
            let image_rect = layout.fit_image(image_width, image_height);
            let bitmap = build_code_bitmap(&luma, image_width, image_height, image_rect)?;

            let instance = unsafe {
                // Safety:
                // - Passing null requests the current process module instance handle.
                GetModuleHandleW(null())
            };
            if instance.is_null() {
                return Err(display_error("GetModuleHandleW returned null"));
            }

            register_window_class(instance)?;

            let (screen_width, screen_height) = unsafe {
                // Safety:
                // - Metric queries have no pointer arguments.
                (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN))
            };
            let (x, y) = layout.centered_origin(screen_width, screen_height);

            let class_name = to_wide(WINDOW_CLASS_NAME);
            let title = to_wide(WINDOW_TITLE);
            let hwnd = unsafe {
                // Safety:
                // - Class and title pointers are valid for the call.
                // - `instance` is a process module handle returned by Win32.
                CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                    class_name.as_ptr(),
                    title.as_ptr(),
                    WS_POPUP,
                    x,
                    y,
                    layout.width,
                    layout.height,
                    null_mut(),
                    null_mut(),
                    instance,
                    null(),
                )
            };
            if hwnd.is_null() {
                return Err(display_error("CreateWindowExW failed"));
            }

            let label_rect = layout.label_rect();
            let label = match create_label(hwnd, instance, label_rect) {
                Ok(label) => label,
                Err(error) => {
                    destroy_and_drain(hwnd);
                    return Err(error);
                }
            };

            let (event_tx, event_rx) = mpsc::channel::<SessionEvent>();
            WINDOW_STATE.with(|slot| {
                *slot.borrow_mut() = Some(WindowState {
                    session: DisplaySession::new(),
                    label,
                    bitmap,
                    image_rect,
                    event_rx,
                    worker: None,
                });
            });

            let hwnd_value = hwnd as isize;
            let worker = spawn_countdown_worker(request.countdown, request.interrupt, move |event| {
                if event_tx.send(event).is_ok() {
                    notify_session_event(hwnd_value);
                }
            });
            let worker = match worker {
                Ok(worker) => worker,
                Err(error) => {
                    destroy_and_drain(hwnd);
                    WINDOW_STATE.with(|slot| slot.borrow_mut().take());
                    return Err(error);
                }
            };
            with_state(|state| state.worker = Some(worker));

            unsafe {
                // Safety:
                // - `hwnd` is a valid window handle created above.
                ShowWindow(hwnd, SW_SHOW);
                SetForegroundWindow(hwnd);
                InvalidateRect(hwnd, null(), 1);
            }
            log_info(
                "display",
                "shown",
                &format!("origin={x},{y} size={}x{}", layout.width, layout.height),
            );

            let loop_result = run_message_loop();

            let state = WINDOW_STATE.with(|slot| slot.borrow_mut().take());
            let cause = state
                .and_then(|mut state| {
                    if let Some(worker) = state.worker.take() {
                        worker.shutdown();
                    }
                    state.session.termination()
                })
                .unwrap_or(TerminationCause::UserClosed);

            loop_result.map(|()| cause)
        }
    }

    fn run_message_loop() -> Result<(), AppError> {
        let mut message: MSG = unsafe {
            // Safety:
            // - Zero-initialization before first `GetMessageW` is valid.
            std::mem::zeroed()
        };

        loop {
            let result = unsafe {
                // Safety:
                // - `message` pointer remains valid across loop iterations.
                GetMessageW(&mut message, null_mut(), 0, 0)
            };
            if result == -1 {
                let error = display_error("GetMessageW returned -1");
                log_error("event_loop", "get_message", &error.to_string());
                return Err(error);
            }
            if result == 0 {
                log_info("event_loop", "end", "WM_QUIT received");
                return Ok(());
            }

            unsafe {
                // Safety:
                // - `message` contents came from `GetMessageW`.
                TranslateMessage(&message);
                DispatchMessageW(&message);
            }
        }
    }

    extern "system" fn window_proc(
        hwnd: HWND,
        message: u32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        match message {
            WM_SESSION_EVENT => {
                handle_session_events(hwnd);
                0
            }
            WM_KEYDOWN if w_param == VK_ESCAPE as usize => {
                apply_event(hwnd, SessionEvent::CloseRequested);
                0
            }
            WM_CLOSE => {
                apply_event(hwnd, SessionEvent::CloseRequested);
                0
            }
            WM_PAINT => {
                let mut paint = unsafe {
                    // Safety:
                    // - Zero-initialization is valid for `PAINTSTRUCT`.
                    std::mem::zeroed::<PAINTSTRUCT>()
                };
                unsafe {
                    // Safety:
                    // - `hwnd` is provided by Win32 for paint processing.
                    let paint_hdc = BeginPaint(hwnd, &mut paint);
                    draw_code_bitmap(paint_hdc);
                    EndPaint(hwnd, &paint);
                }
                0
            }
            WM_DESTROY => {
                let worker = WINDOW_STATE.with(|slot| {
                    slot.borrow_mut()
                        .as_mut()
                        .and_then(|state| state.worker.take())
                });
                if let Some(worker) = worker {
                    worker.shutdown();
                }
                log_info("display", "destroy", "window destroyed; posting quit");
                unsafe {
                    // Safety:
                    // - Ends the message loop on the UI thread.
                    PostQuitMessage(0);
                }
                0
            }
            _ => unsafe {
                // Safety:
                // - Delegate unhandled messages to default Win32 behavior.
                DefWindowProcW(hwnd, message, w_param, l_param)
            },
        }
    }

    fn handle_session_events(hwnd: HWND) {
        loop {
            let next = WINDOW_STATE.with(|slot| {
                slot.borrow()
                    .as_ref()
                    .and_then(|state| state.event_rx.try_recv().ok())
            });
            let Some(event) = next else {
                break;
            };
            if apply_event(hwnd, event) {
                break;
            }
        }
    }

    /// Applies one event on the UI thread. Returns `true` once the window was
    /// asked to close.
    fn apply_event(hwnd: HWND, event: SessionEvent) -> bool {
        let action = WINDOW_STATE.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|state| (state.session.handle(event), state.label))
        });

        match action {
            Some((SessionAction::UpdateLabel(text), label)) => {
                set_control_text(label, &text);
                false
            }
            Some((SessionAction::Close(cause), _)) => {
                log_info("display", "close", &format!("cause={cause}"));
                unsafe {
                    // Safety:
                    // - Called on the UI thread that created `hwnd`.
                    DestroyWindow(hwnd);
                }
                true
            }
            Some((SessionAction::Ignore, _)) => false,
            None => {
                // No session state: close requests still have to end the loop.
                if event == SessionEvent::CloseRequested {
                    unsafe {
                        // Safety:
                        // - Called on the UI thread that created `hwnd`.
                        DestroyWindow(hwnd);
                    }
                    return true;
                }
                false
            }
        }
    }

    fn notify_session_event(hwnd_value: isize) {
        unsafe {
            // Safety:
            // - Posts a custom message to the UI thread queue; no pointers are transferred.
            PostMessageW(hwnd_value as HWND, WM_SESSION_EVENT, 0, 0);
        }
    }

    fn with_state<F>(f: F)
    where
        F: FnOnce(&mut WindowState),
    {
        WINDOW_STATE.with(|slot| {
            if let Some(state) = slot.borrow_mut().as_mut() {
                f(state);
            }
        });
    }

    fn register_window_class(instance: *mut c_void) -> Result<(), AppError> {
        let class_name = to_wide(WINDOW_CLASS_NAME);
        let cursor = unsafe {
            // Safety:
            // - Uses predefined system cursor identifier.
            LoadCursorW(null_mut(), IDC_ARROW)
        };

        let window_class = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            lpszClassName: class_name.as_ptr(),
            hCursor: cursor,
            hbrBackground: (COLOR_WINDOW as usize + 1) as *mut c_void,
            ..unsafe {
                // Safety:
                // - Zero-initialization for unused optional fields is valid.
                std::mem::zeroed()
            }
        };

        let atom = unsafe {
            // Safety:
            // - `window_class` is fully initialized and points to stable memory.
            RegisterClassW(&window_class)
        };
        if atom == 0 {
            let last_error = unsafe {
                // Safety:
                // - Reads the calling thread's last-error value.
                GetLastError()
            };
            if last_error != ERROR_CLASS_ALREADY_EXISTS {
                return Err(display_error(&format!(
                    "RegisterClassW failed with code {last_error}"
                )));
            }
        }
        Ok(())
    }

    fn create_label(parent: HWND, instance: *mut c_void, rect: Rect) -> Result<HWND, AppError> {
        let class_name = to_wide("STATIC");
        let text = to_wide("");

        let hwnd = unsafe {
            // Safety:
            // - Input pointers are stable for this call and parent/instance handles are valid.
            CreateWindowExW(
                0,
                class_name.as_ptr(),
                text.as_ptr(),
                WS_CHILD | WS_VISIBLE | SS_CENTER,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                parent,
                null_mut(),
                instance,
                null(),
            )
        };

        if hwnd.is_null() {
            return Err(display_error("failed to create countdown label"));
        }
        Ok(hwnd)
    }

    fn destroy_and_drain(hwnd: HWND) {
        unsafe {
            // Safety:
            // - `hwnd` was created on this thread and is still alive.
            DestroyWindow(hwnd);
        }
        let _ = run_message_loop();
    }

    fn load_artifact(path: &Path) -> Result<(u32, u32, image::GrayImage), AppError> {
        let luma = image::open(path)
            .map_err(|error| {
                display_error(&format!(
                    "failed to load artifact '{}': {error}",
                    path.display()
                ))
            })?
            .to_luma8();
        Ok((luma.width(), luma.height(), luma))
    }

    fn build_code_bitmap(
        luma: &image::GrayImage,
        image_width: u32,
        image_height: u32,
        target: Rect,
    ) -> Result<CodeBitmap, AppError> {
        if image_width == 0 || image_height == 0 {
            return Err(display_error("artifact image is empty"));
        }

        let scaled = image::imageops::resize(
            luma,
            target.width.max(1) as u32,
            target.height.max(1) as u32,
            image::imageops::FilterType::Nearest,
        );

        // DIB rows are padded to 4-byte boundaries.
        let row_bytes = (scaled.width() as usize * 3).div_ceil(4) * 4;
        let mut bgr24 = vec![0_u8; row_bytes * scaled.height() as usize];
        for (x, y, pixel) in scaled.enumerate_pixels() {
            let offset = y as usize * row_bytes + x as usize * 3;
            let value = pixel.0[0];
            bgr24[offset..offset + 3].copy_from_slice(&[value, value, value]);
        }

        Ok(CodeBitmap {
            width: scaled.width() as i32,
            height: scaled.height() as i32,
            bgr24,
        })
    }

    fn draw_code_bitmap(paint_hdc: *mut c_void) {
        WINDOW_STATE.with(|slot| {
            let state = slot.borrow();
            let Some(state) = state.as_ref() else {
                return;
            };
            let bitmap = &state.bitmap;

            let mut bitmap_info: BITMAPINFO = unsafe {
                // Safety:
                // - Zeroed `BITMAPINFO` is a valid baseline before header assignment.
                std::mem::zeroed()
            };
            bitmap_info.bmiHeader = BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: bitmap.width,
                // Negative height marks top-down row order.
                biHeight: -bitmap.height,
                biPlanes: 1,
                biBitCount: 24,
                biCompression: BI_RGB,
                ..unsafe {
                    // Safety:
                    // - Remaining fields are optional for BI_RGB source buffers.
                    std::mem::zeroed()
                }
            };

            unsafe {
                // Safety:
                // - Bitmap buffer remains alive for the duration of the call.
                // - BITMAPINFO header matches the padded BGR24 top-down layout.
                StretchDIBits(
                    paint_hdc,
                    state.image_rect.x,
                    state.image_rect.y,
                    state.image_rect.width,
                    state.image_rect.height,
                    0,
                    0,
                    bitmap.width,
                    bitmap.height,
                    bitmap.bgr24.as_ptr() as *const c_void,
                    &bitmap_info,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );
            }
        });
    }

    fn set_control_text(control: HWND, text: &str) {
        let wide = to_wide(text);
        unsafe {
            // Safety:
            // - `control` is a live child HWND and UTF-16 pointer is valid for call.
            SetWindowTextW(control, wide.as_ptr());
        }
    }

    fn display_error(message: &str) -> AppError {
        AppError::Display(message.to_string())
    }

    fn to_wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }
}
