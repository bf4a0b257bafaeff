//! Screenshot capture using Windows Graphics Capture API.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use windows::core::Interface;
use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{Direct3D11CaptureFramePool, GraphicsCaptureItem};
use windows::Graphics::DirectX::Direct3D11::IDirect3DDevice;
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::System::WinRT::Direct3D11::CreateDirect3D11DeviceFromDXGIDevice;
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;

use super::window::{get_client_area_info, hwnd_of};
use super::{bgra_region_to_rgba, GameWindow, ScreenCapture};
use crate::calibration::Rect;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Captures regions of one game window's client area.
///
/// The D3D11 device and capture item are created once; each screenshot opens
/// a short capture session, copies one frame to a staging texture and crops
/// the requested client region out of it.
pub struct WindowCapture {
    hwnd: HWND,
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    d3d_device: IDirect3DDevice,
    item: GraphicsCaptureItem,
}

impl WindowCapture {
    pub fn new(window: &GameWindow) -> Result<Self> {
        let hwnd = hwnd_of(window);
        let (device, context) = create_d3d11_device()?;
        let d3d_device = create_direct3d_device(&device)?;
        let item = create_capture_item(hwnd)?;
        crate::log_debug("Window capture initialized");
        Ok(Self {
            hwnd,
            device,
            context,
            d3d_device,
            item,
        })
    }

    fn grab(&self, region: Rect) -> Result<RgbaImage> {
        let (_, client_offset) = get_client_area_info(self.hwnd)?;
        let size = self.item.Size()?;

        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &self.d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&self.item)?;

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();
        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        session.StartCapture()?;

        let start = Instant::now();
        while !frame_arrived.load(Ordering::SeqCst) {
            if start.elapsed() > FRAME_TIMEOUT {
                let _ = session.Close();
                let _ = frame_pool.Close();
                return Err(anyhow!("Timeout waiting for frame"));
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let frame = frame_pool.TryGetNextFrame()?;
        let surface = frame.Surface()?;
        let access: windows::Win32::System::WinRT::Direct3D11::IDirect3DDxgiInterfaceAccess =
            surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };

        let staging_resource = staging_texture.cast::<ID3D11Resource>()?;
        unsafe {
            self.context
                .CopyResource(&staging_resource, &texture.cast::<ID3D11Resource>()?);
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            self.context
                .Map(&staging_resource, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            mapped
        };

        let src_data = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                (mapped.RowPitch * desc.Height) as usize,
            )
        };

        let origin = (
            (client_offset.x + region.x).max(0) as u32,
            (client_offset.y + region.y).max(0) as u32,
        );
        let img = bgra_region_to_rgba(
            src_data,
            mapped.RowPitch as usize,
            (desc.Width, desc.Height),
            origin,
            (region.w.max(0) as u32, region.h.max(0) as u32),
        );

        unsafe {
            self.context.Unmap(&staging_resource, 0);
        }

        session.Close()?;
        frame_pool.Close()?;

        Ok(img)
    }
}

impl ScreenCapture for WindowCapture {
    fn screenshot(&mut self, region: Rect) -> Result<RgbaImage> {
        self.grab(region)
            .with_context(|| format!("Failed to capture region {:?}", region))
    }
}

/// Creates a Direct3D 11 device and immediate context.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// Creates the WinRT Direct3D device wrapper required by the capture API.
fn create_direct3d_device(device: &ID3D11Device) -> Result<IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_capture_item(hwnd: HWND) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };
    unsafe {
        interop
            .CreateForWindow(hwnd)
            .context("Failed to create capture item for window")
    }
}
